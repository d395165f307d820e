//! The capability contract a checker satisfies.
//!
//! A checker declares its operations explicitly: `query_methods` returns the
//! query operations that produce candidate records and `check_methods` returns
//! the check operations run against every record. Returning `None` means the
//! checker does not declare that kind of operation at all; the runner reports
//! it instead of crashing.

use std::any::{type_name, Any};

use anyhow::anyhow;

use crate::record::Record;

/// Records streamed out of a query operation.
pub type RecordStream<'a> = Box<dyn Iterator<Item = anyhow::Result<Record>> + 'a>;

type QueryFn<'a> = Box<dyn Fn() -> anyhow::Result<RecordStream<'a>> + 'a>;
type CheckFn<'a> = Box<dyn Fn(&Record) -> anyhow::Result<bool> + 'a>;

/// A named operation producing records.
pub struct Query<'a> {
    name: String,
    run: QueryFn<'a>,
}

impl<'a> Query<'a> {
    /// A query returning a whole collection at once.
    pub fn new<F, I>(name: impl Into<String>, query: F) -> Self
    where
        F: Fn() -> anyhow::Result<I> + 'a,
        I: IntoIterator<Item = Record>,
        I::IntoIter: 'a,
    {
        Self {
            name: name.into(),
            run: Box::new(move || {
                let records: RecordStream<'a> = Box::new(query()?.into_iter().map(Ok));
                Ok(records)
            }),
        }
    }

    /// A query yielding records one at a time; any item may fail.
    pub fn streaming<F>(name: impl Into<String>, query: F) -> Self
    where
        F: Fn() -> anyhow::Result<RecordStream<'a>> + 'a,
    {
        Self {
            name: name.into(),
            run: Box::new(query),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self) -> anyhow::Result<RecordStream<'a>> {
        (self.run)()
    }
}

impl std::fmt::Debug for Query<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Query").field(&self.name).finish()
    }
}

/// A named operation validating one record.
pub struct Check<'a> {
    name: String,
    run: CheckFn<'a>,
}

impl<'a> Check<'a> {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Record) -> anyhow::Result<bool> + 'a,
    {
        Self {
            name: name.into(),
            run: Box::new(check),
        }
    }

    /// A check over records of a known type. A record of any other type
    /// is an error.
    pub fn typed<T, F>(name: impl Into<String>, check: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> anyhow::Result<bool> + 'a,
    {
        Self::new(name, move |record: &Record| {
            let value = record.downcast_ref::<T>().ok_or_else(|| {
                anyhow!(
                    "record {} is a {}, expected {}",
                    record.id(),
                    record.type_name(),
                    type_name::<T>()
                )
            })?;
            check(value)
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(&self, record: &Record) -> anyhow::Result<bool> {
        (self.run)(record)
    }
}

impl std::fmt::Debug for Check<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Check").field(&self.name).finish()
    }
}

/// A unit of data-quality work.
pub trait Checker {
    /// Identity used in results and reports. Defaults to the type name.
    fn name(&self) -> String {
        short_type_name(type_name::<Self>()).to_string()
    }

    /// Query operations in the order they should run.
    fn query_methods(&self) -> Option<Vec<Query<'_>>> {
        None
    }

    /// Check operations in the order they should run against each record.
    fn check_methods(&self) -> Option<Vec<Check<'_>>> {
        None
    }
}

/// Strip module paths from a type name, keeping generic arguments readable.
pub(crate) fn short_type_name(full: &str) -> &str {
    let end = full.find('<').unwrap_or(full.len());
    match full[..end].rfind("::") {
        Some(start) => &full[start + 2..],
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Domains {
        names: Vec<&'static str>,
    }

    impl Domains {
        fn query_all(&self) -> anyhow::Result<Vec<Record>> {
            Ok(self.names.iter().map(|n| Record::new(n.to_string())).collect())
        }

        fn check_has_tld(&self, name: &str) -> anyhow::Result<bool> {
            Ok(name.contains('.'))
        }
    }

    impl Checker for Domains {
        fn query_methods(&self) -> Option<Vec<Query<'_>>> {
            Some(vec![Query::new("query_all", || self.query_all())])
        }

        fn check_methods(&self) -> Option<Vec<Check<'_>>> {
            Some(vec![Check::typed("check_has_tld", |name: &String| {
                self.check_has_tld(name)
            })])
        }
    }

    struct Bare;

    impl Checker for Bare {}

    #[test]
    fn test_default_name_is_short_type_name() {
        assert_eq!(Bare.name(), "Bare");
        assert_eq!(short_type_name("a::b::Thing<c::D>"), "Thing<c::D>");
        assert_eq!(short_type_name("Plain"), "Plain");
    }

    #[test]
    fn test_bare_checker_declares_nothing() {
        assert!(Bare.query_methods().is_none());
        assert!(Bare.check_methods().is_none());
    }

    #[test]
    fn test_query_and_check_operations() {
        let checker = Domains {
            names: vec!["example.com", "localhost"],
        };
        let queries = checker.query_methods().unwrap();
        let checks = checker.check_methods().unwrap();
        assert_eq!(queries[0].name(), "query_all");
        assert_eq!(checks[0].name(), "check_has_tld");

        let verdicts: Vec<bool> = queries[0]
            .records()
            .unwrap()
            .map(|record| checks[0].run(&record.unwrap()).unwrap())
            .collect();
        assert_eq!(verdicts, vec![true, false]);
    }

    #[test]
    fn test_typed_check_rejects_other_record_types() {
        let check = Check::typed("check_len", |s: &String| Ok(!s.is_empty()));
        let err = check.run(&Record::new(5u8)).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("record 5 is a u8"), "{}", message);
        assert!(message.contains("String"));
    }

    #[test]
    fn test_streaming_query_surfaces_item_errors() {
        let query = Query::streaming("query_pages", || {
            let items = vec![Ok(Record::new(1)), Err(anyhow!("page 2 timed out"))];
            Ok(Box::new(items.into_iter()) as RecordStream<'static>)
        });
        let items: Vec<_> = query.records().unwrap().collect();
        assert!(items[0].is_ok());
        assert_eq!(items[1].as_ref().unwrap_err().to_string(), "page 2 timed out");
    }
}
