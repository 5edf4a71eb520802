//! Rule parser port and the reflective-then-textual fallback combinator.

use std::future::Future;
use std::path::Path;

use swa_types::error::RuleError;
use swa_types::rule::RuleRecord;

/// Extracts rule records, with leaf flags, from a definition file.
///
/// Uses RPITIT (no async_trait macro).
pub trait RuleParser: Send + Sync {
    fn parse(
        &self,
        definition: &Path,
    ) -> impl Future<Output = Result<Vec<RuleRecord>, RuleError>> + Send;
}

/// Tries `primary` and falls back to `fallback` on any error.
pub struct FallbackRuleParser<P, F> {
    primary: P,
    fallback: F,
}

impl<P: RuleParser, F: RuleParser> FallbackRuleParser<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P: RuleParser, F: RuleParser> RuleParser for FallbackRuleParser<P, F> {
    async fn parse(&self, definition: &Path) -> Result<Vec<RuleRecord>, RuleError> {
        match self.primary.parse(definition).await {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::debug!(
                    definition = %definition.display(),
                    error = %e,
                    "primary rule parser failed, falling back"
                );
                self.fallback.parse(definition).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl RuleParser for Failing {
        async fn parse(&self, _definition: &Path) -> Result<Vec<RuleRecord>, RuleError> {
            Err(RuleError::Reflection("engine not installed".into()))
        }
    }

    struct Fixed(&'static str);

    impl RuleParser for Fixed {
        async fn parse(&self, _definition: &Path) -> Result<Vec<RuleRecord>, RuleError> {
            Ok(vec![RuleRecord {
                name: self.0.to_string(),
                ..Default::default()
            }])
        }
    }

    #[tokio::test]
    async fn primary_wins_when_it_succeeds() {
        let parser = FallbackRuleParser::new(Fixed("reflective"), Fixed("textual"));
        let records = parser.parse(Path::new("Snakefile")).await.unwrap();
        assert_eq!(records[0].name, "reflective");
    }

    #[tokio::test]
    async fn falls_back_on_failure() {
        let parser = FallbackRuleParser::new(Failing, Fixed("textual"));
        let records = parser.parse(Path::new("Snakefile")).await.unwrap();
        assert_eq!(records[0].name, "textual");
    }

    #[tokio::test]
    async fn both_failing_propagates_fallback_error() {
        let parser = FallbackRuleParser::new(Failing, Failing);
        assert!(parser.parse(Path::new("Snakefile")).await.is_err());
    }
}
