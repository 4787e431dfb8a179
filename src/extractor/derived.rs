//! Derived-field extraction run on a job detail's free-form description text.
//!
//! Each function degrades gracefully on input that doesn't match anything —
//! there is no error path here, only absent/default values, matching the
//! parser's sentinel-on-missing-field contract.

use std::sync::OnceLock;

use regex::Regex;

/// Structured salary parsed out of free text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalaryInfo {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub currency: &'static str,
    pub equity_offered: bool,
}

const EQUITY_KEYWORDS: [&str; 5] = ["equity", "stock options", "rsu", "options", "stock"];

fn salary_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[$£€¥]?\s*(\d{1,3}(?:,\d{3})*(?:\.\d+)?)\s*([Kk])?").unwrap()
    })
}

/// Extract {min, max, currency, equity_offered} from a description.
pub fn extract_salary_structured(text: &str) -> SalaryInfo {
    let currency = first_currency_symbol(text);
    let equity_offered = {
        let lower = text.to_lowercase();
        EQUITY_KEYWORDS.iter().any(|kw| lower.contains(kw))
    };
    let has_k_letter = text.chars().any(|c| c == 'k' || c == 'K');

    let tokens: Vec<f64> = salary_token_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let num = caps.get(1)?.as_str();
            let cleaned: String = num.chars().filter(|c| *c != ',').collect();
            let mut value: f64 = cleaned.parse().ok()?;
            let own_k = caps.get(2).is_some();
            if own_k {
                value *= 1000.0;
            } else if has_k_letter && value < 1000.0 {
                value *= 1000.0;
            }
            Some(value)
        })
        .collect();

    let (min, max) = match tokens.len() {
        0 => (None, None),
        1 => (Some(tokens[0]), Some(tokens[0])),
        _ => {
            let a = tokens[0];
            let b = tokens[1];
            (Some(a.min(b)), Some(a.max(b)))
        }
    };

    SalaryInfo {
        min,
        max,
        currency,
        equity_offered,
    }
}

fn first_currency_symbol(text: &str) -> &'static str {
    for ch in text.chars() {
        match ch {
            '$' => return "USD",
            '£' => return "GBP",
            '€' => return "EUR",
            '¥' => return "JPY",
            _ => {}
        }
    }
    "USD"
}

const REMOTE_KEYWORDS: [&str; 9] = [
    "remote",
    "work from home",
    "wfh",
    "distributed",
    "anywhere",
    "fully remote",
    "remote-first",
    "remote work",
    "work remotely",
];

pub fn extract_remote_eligibility(text: &str) -> bool {
    let lower = text.to_lowercase();
    REMOTE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

const VISA_KEYWORDS: [&str; 9] = [
    "visa sponsorship",
    "h1b",
    "h-1b",
    "work authorization",
    "sponsorship available",
    "sponsor visa",
    "visa support",
    "eligible for visa",
    "can sponsor",
];

pub fn extract_visa_sponsorship(text: &str) -> bool {
    let lower = text.to_lowercase();
    VISA_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// (match pattern, canonical display name). Acronyms are kept uppercase;
/// everything else is title-cased on output.
const SKILL_DICTIONARY: &[(&str, &str)] = &[
    // languages
    ("python", "Python"),
    ("javascript", "JavaScript"),
    ("typescript", "TypeScript"),
    ("java", "Java"),
    ("c++", "C++"),
    ("c#", "C#"),
    ("golang", "Go"),
    ("go ", "Go"),
    ("rust", "Rust"),
    ("ruby", "Ruby"),
    ("swift", "Swift"),
    ("kotlin", "Kotlin"),
    ("scala", "Scala"),
    ("php", "PHP"),
    // ML frameworks
    ("pytorch", "PyTorch"),
    ("tensorflow", "TensorFlow"),
    ("keras", "Keras"),
    ("scikit-learn", "scikit-learn"),
    ("xgboost", "XGBoost"),
    ("hugging face", "Hugging Face"),
    ("langchain", "LangChain"),
    ("jax", "JAX"),
    // clouds
    ("aws", "AWS"),
    ("gcp", "GCP"),
    ("azure", "Azure"),
    // databases
    ("postgresql", "PostgreSQL"),
    ("postgres", "PostgreSQL"),
    ("mysql", "MySQL"),
    ("mongodb", "MongoDB"),
    ("redis", "Redis"),
    ("elasticsearch", "Elasticsearch"),
    ("cassandra", "Cassandra"),
    ("dynamodb", "DynamoDB"),
    ("snowflake", "Snowflake"),
    // devops
    ("docker", "Docker"),
    ("kubernetes", "Kubernetes"),
    ("terraform", "Terraform"),
    ("jenkins", "Jenkins"),
    ("ci/cd", "CI/CD"),
    ("ansible", "Ansible"),
    ("github actions", "GitHub Actions"),
    // data tools
    ("spark", "Spark"),
    ("airflow", "Airflow"),
    ("kafka", "Kafka"),
    ("pandas", "Pandas"),
    ("numpy", "NumPy"),
    ("tableau", "Tableau"),
    ("looker", "Looker"),
    ("dbt", "dbt"),
];

/// Match the fixed skills dictionary against free text. Returns a sorted,
/// duplicate-free list of canonical skill names.
pub fn extract_skills(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut matched: Vec<String> = SKILL_DICTIONARY
        .iter()
        .filter(|(pattern, _)| lower.contains(pattern))
        .map(|(_, canonical)| canonical.to_string())
        .collect();
    matched.sort();
    matched.dedup();
    matched
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescriptionInsights {
    pub summary: String,
    pub key_requirements: Vec<String>,
    pub key_responsibilities_preview: String,
}

fn years_experience_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\+?\s*years?").unwrap())
}

const DEGREE_KEYWORDS: [&str; 5] = ["bachelor", "master", "phd", "doctorate", "degree"];
const RESPONSIBILITY_VERBS: [&str; 8] = [
    "Build", "Design", "Develop", "Lead", "Manage", "Deploy", "Create", "Implement",
];

pub fn extract_description_insights(text: &str) -> DescriptionInsights {
    let summary = summarize(text);
    let mut key_requirements = Vec::new();

    if let Some(caps) = years_experience_regex().captures(text) {
        if let Some(n) = caps.get(1) {
            key_requirements.push(format!("{}+ years experience", n.as_str()));
        }
    }

    let lower = text.to_lowercase();
    if let Some(keyword) = DEGREE_KEYWORDS.iter().find(|kw| lower.contains(*kw)) {
        let mut chars = keyword.chars();
        let capitalized = match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        };
        key_requirements.push(capitalized);
    }

    let skills = extract_skills(text);
    key_requirements.extend(skills.into_iter().take(5));

    let key_responsibilities_preview = responsibilities_preview(text);

    DescriptionInsights {
        summary,
        key_requirements,
        key_responsibilities_preview,
    }
}

fn summarize(text: &str) -> String {
    let truncated: String = text.chars().take(300).collect();
    match truncated.rfind(['.', '!', '?']) {
        Some(idx) => truncated[..=idx].trim().to_string(),
        None => truncated.trim().to_string(),
    }
}

fn responsibilities_preview(text: &str) -> String {
    let lines: Vec<String> = text
        .lines()
        .map(|l| l.trim())
        .filter(|l| RESPONSIBILITY_VERBS.iter().any(|v| l.starts_with(v)))
        .take(3)
        .map(|l| l.chars().take(80).collect::<String>())
        .collect();
    lines.join(" • ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salary_range_with_equity() {
        let info = extract_salary_structured("$150,000/yr + RSU");
        assert_eq!(info.min, Some(150_000.0));
        assert_eq!(info.max, Some(150_000.0));
        assert_eq!(info.currency, "USD");
        assert!(info.equity_offered);
    }

    #[test]
    fn salary_k_suffix_currency() {
        let info = extract_salary_structured("€60K - €80K");
        assert_eq!(info.min, Some(60_000.0));
        assert_eq!(info.max, Some(80_000.0));
        assert_eq!(info.currency, "EUR");
        assert!(!info.equity_offered);
    }

    #[test]
    fn salary_no_tokens() {
        let info = extract_salary_structured("Competitive compensation");
        assert_eq!(info.min, None);
        assert_eq!(info.max, None);
    }

    #[test]
    fn remote_keyword_detection() {
        assert!(extract_remote_eligibility("This is a fully remote role."));
        assert!(extract_remote_eligibility("Work from home encouraged"));
        assert!(!extract_remote_eligibility("On-site in San Francisco"));
    }

    #[test]
    fn visa_keyword_detection() {
        assert!(extract_visa_sponsorship("We offer H1B sponsorship"));
        assert!(extract_visa_sponsorship("eligible for visa support"));
        assert!(!extract_visa_sponsorship("Must have US citizenship"));
    }

    #[test]
    fn skills_are_sorted_and_deduped() {
        let skills = extract_skills("Strong Python and python experience with AWS and aws.");
        assert_eq!(skills, vec!["AWS".to_string(), "Python".to_string()]);
    }

    #[test]
    fn description_insights_extracts_requirements_and_preview() {
        let text = "We need 5+ years of experience and a Bachelor's degree.\nBuild scalable systems.\nDesign APIs.\nManage a small team.\nUnrelated line.";
        let insights = extract_description_insights(text);
        assert!(insights.key_requirements.contains(&"5+ years experience".to_string()));
        assert!(insights.key_requirements.iter().any(|r| r == "Bachelor"));
        assert!(insights.key_responsibilities_preview.contains("Build scalable systems."));
        assert!(insights.key_responsibilities_preview.contains(" • "));
    }
}
