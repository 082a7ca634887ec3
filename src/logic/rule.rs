//! `Rule`: a named implication with a confidence and provenance (spec
//! §4.I). Serialized as `name|premise|conclusion|confidence|source`.

use crate::error::{Result, VfsError};
use crate::logic::formula::{parse, Formula};
use crate::tags::TagRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSource {
    Hardcoded,
    Learned,
    AiGenerated,
    User,
}

impl RuleSource {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleSource::Hardcoded => "hardcoded",
            RuleSource::Learned => "learned",
            RuleSource::AiGenerated => "ai-generated",
            RuleSource::User => "user",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "hardcoded" => Ok(RuleSource::Hardcoded),
            "learned" => Ok(RuleSource::Learned),
            "ai-generated" => Ok(RuleSource::AiGenerated),
            "user" => Ok(RuleSource::User),
            other => Err(VfsError::ParseError(format!("unknown rule source: {other}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub premise: Formula,
    pub conclusion: Formula,
    pub confidence: f64,
    pub source: RuleSource,
}

impl Rule {
    pub fn premise_str(&self, registry: &TagRegistry) -> String {
        self.premise.to_string(registry)
    }

    pub fn conclusion_str(&self, registry: &TagRegistry) -> String {
        self.conclusion.to_string(registry)
    }

    /// `name|premiseStr|conclusionStr|confidence|source`. Neither `name`
    /// nor `source` may contain `|`.
    pub fn serialize(&self, registry: &TagRegistry) -> Result<String> {
        if self.name.contains('|') {
            return Err(VfsError::Internal(format!("rule name contains '|': {}", self.name)));
        }
        Ok(format!(
            "{}|{}|{}|{}|{}",
            self.name,
            self.premise_str(registry),
            self.conclusion_str(registry),
            self.confidence,
            self.source.as_str()
        ))
    }

    pub fn deserialize(line: &str, registry: &mut TagRegistry) -> Result<Self> {
        let parts: Vec<&str> = line.splitn(5, '|').collect();
        let [name, premise, conclusion, confidence, source] = parts.as_slice() else {
            return Err(VfsError::ParseError(format!("malformed rule line: {line}")));
        };
        let confidence: f64 =
            confidence.parse().map_err(|_| VfsError::ParseError(format!("bad confidence in rule line: {line}")))?;
        Ok(Rule {
            name: name.to_string(),
            premise: parse(premise, registry)?,
            conclusion: parse(conclusion, registry)?,
            confidence,
            source: RuleSource::parse(source)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_deserialize_round_trip() {
        let mut reg = TagRegistry::new();
        let rule = Rule {
            name: "offline-implies-no-network".into(),
            premise: parse("offline", &mut reg).unwrap(),
            conclusion: parse("(not network)", &mut reg).unwrap(),
            confidence: 1.0,
            source: RuleSource::Hardcoded,
        };
        let line = rule.serialize(&reg).unwrap();
        assert_eq!(line, "offline-implies-no-network|offline|(not network)|1|hardcoded");

        let mut reg2 = TagRegistry::new();
        let back = Rule::deserialize(&line, &mut reg2).unwrap();
        assert_eq!(back.name, rule.name);
        assert_eq!(back.confidence, rule.confidence);
    }
}
