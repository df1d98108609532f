//! Rule-based agent selection.
//!
//! Rules are checked in order and the first match wins. A message no rule
//! matches goes to the fallback agent.

use crate::agent::AgentKind;
use crate::expression;
use regex::Regex;

const MATH_KEYWORDS: &[&str] = &["calculate", "compute", "sum of", "multiply", "divide"];

const RESEARCH_KEYWORDS: &[&str] = &[
    "search",
    "look up",
    "lookup",
    "find information",
    "find out",
    "latest",
    "news",
    "who is",
    "who was",
];

pub enum Matcher {
    Pattern(Regex),
    /// An arithmetic expression anywhere in the message.
    Arithmetic,
    /// Case-insensitive substring match on any keyword.
    Keywords(&'static [&'static str]),
}

impl Matcher {
    fn matches(&self, message: &str, lowered: &str) -> bool {
        match self {
            Matcher::Pattern(re) => re.is_match(message),
            Matcher::Arithmetic => expression::contains_expression(message),
            Matcher::Keywords(words) => words.iter().any(|w| lowered.contains(w)),
        }
    }
}

pub struct Rule {
    pub agent: AgentKind,
    pub matcher: Matcher,
}

pub struct RuleTable {
    rules: Vec<Rule>,
    fallback: AgentKind,
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>, fallback: AgentKind) -> Self {
        Self { rules, fallback }
    }

    pub fn select(&self, message: &str) -> AgentKind {
        let lowered = message.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(message, &lowered))
            .map(|rule| rule.agent)
            .unwrap_or(self.fallback)
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new(
            vec![
                Rule {
                    agent: AgentKind::MathWhiz,
                    matcher: Matcher::Arithmetic,
                },
                Rule {
                    agent: AgentKind::MathWhiz,
                    matcher: Matcher::Keywords(MATH_KEYWORDS),
                },
                Rule {
                    agent: AgentKind::WebResearcher,
                    matcher: Matcher::Keywords(RESEARCH_KEYWORDS),
                },
            ],
            AgentKind::Generalist,
        )
    }
}
