//! Skill extraction: explicit skill sections, a canonical vocabulary, and
//! per-skill depth and seniority-qualifier hits.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;

use super::experience::is_section_header;
use super::normalize::signature;

static SKILL_SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:technical skills?|core qualifications?|skills?|highlights?)\s*(?::\s*(.*))?$")
        .expect("valid skill header regex")
});

static LABEL_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Za-z ]{0,30}:\s*$").expect("valid label regex"));

static ITEM_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,;|]").expect("valid separator regex"));

static YEARS_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d+(?:\.\d+)?\+?\s*(?:years?|yrs?|anos)\b").expect("valid years regex")
});

static QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:advanced|expert|senior|proficient|specialist|avan[cç]ado)\b")
        .expect("valid qualifier regex")
});

const MAX_SECTION_LINES: usize = 30;
const MIN_ITEM_LEN: usize = 3;

/// Canonical skill → aliases. Matching is case-insensitive on token boundaries.
const SKILL_ALIASES: &[(&str, &[&str])] = &[
    ("python", &["python"]),
    ("java", &["java"]),
    ("javascript", &["javascript", "js", "ecmascript"]),
    ("typescript", &["typescript"]),
    ("rust", &["rust"]),
    ("go", &["golang"]),
    ("c++", &["c++", "cpp"]),
    ("c#", &["c#", ".net", "dotnet"]),
    ("sql", &["sql", "mysql", "postgresql", "postgres", "sql server", "t-sql"]),
    ("nosql", &["nosql", "mongodb", "cassandra", "dynamodb"]),
    ("html", &["html", "html5"]),
    ("css", &["css", "css3", "sass"]),
    ("react", &["react", "reactjs", "react.js"]),
    ("angular", &["angular", "angularjs"]),
    ("nodejs", &["node.js", "nodejs"]),
    ("linux", &["linux", "unix", "bash"]),
    ("git", &["git", "github", "gitlab"]),
    ("docker", &["docker", "containers"]),
    ("kubernetes", &["kubernetes", "k8s"]),
    ("aws", &["aws", "amazon web services"]),
    ("azure", &["azure"]),
    ("gcp", &["gcp", "google cloud"]),
    ("terraform", &["terraform"]),
    ("spark", &["spark", "pyspark"]),
    ("machine learning", &["machine learning", "ml", "deep learning"]),
    ("data analysis", &["data analysis", "data analytics", "pandas"]),
    ("excel", &["excel", "spreadsheets"]),
    ("power bi", &["power bi", "powerbi"]),
    ("tableau", &["tableau"]),
    ("sap", &["sap"]),
    ("salesforce", &["salesforce", "crm"]),
    ("quickbooks", &["quickbooks"]),
    ("agile", &["agile", "scrum", "kanban"]),
    ("project management", &["project management", "pmp"]),
    ("customer service", &["customer service", "customer support"]),
    ("accounting", &["accounting", "bookkeeping", "accounts payable", "accounts receivable"]),
    ("microsoft office", &["microsoft office", "ms office", "outlook", "powerpoint"]),
];

static ALIAS_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    SKILL_ALIASES
        .iter()
        .flat_map(|(canonical, aliases)| aliases.iter().map(move |alias| (*canonical, *alias)))
        .filter_map(|(canonical, alias)| {
            let pattern = format!(r"(?i)(?:^|[^a-z0-9+#.])({})(?:$|[^a-z0-9+#])", regex::escape(alias));
            Regex::new(&pattern).ok().map(|re| (canonical, re))
        })
        .collect()
});

/// Canonical lookup used to fold explicit skills onto the vocabulary.
static ALIAS_TO_CANONICAL: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    SKILL_ALIASES
        .iter()
        .flat_map(|(canonical, aliases)| aliases.iter().map(move |alias| (*alias, *canonical)))
        .collect()
});

/// Folds a free-form skill name onto its canonical form, or lowercases it.
pub fn canonical_skill(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    ALIAS_TO_CANONICAL
        .get(lowered.as_str())
        .map(|c| c.to_string())
        .unwrap_or(lowered)
}

/// Items listed under a skills/qualifications/highlights heading, as stemmed
/// signatures, sorted and unique.
pub fn extract_section_skills(text: &str, stemming: bool) -> Vec<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut skills = BTreeSet::new();
    let mut i = 0;

    while i < lines.len() {
        let Some(caps) = SKILL_SECTION_HEADER.captures(lines[i]) else {
            i += 1;
            continue;
        };
        let mut body: Vec<&str> = caps.get(1).map(|m| vec![m.as_str()]).unwrap_or_default();
        let mut j = i + 1;
        while j < lines.len() && j - i <= MAX_SECTION_LINES {
            let line = lines[j].trim();
            if is_section_header(line) || LABEL_LINE.is_match(line) {
                break;
            }
            body.push(line);
            j += 1;
        }

        for line in body {
            for item in ITEM_SEPARATORS.split(line) {
                let item = item.trim().trim_start_matches('-').trim();
                if item.len() < MIN_ITEM_LEN {
                    continue;
                }
                let sig = signature(item, stemming);
                if !sig.is_empty() {
                    skills.insert(sig);
                }
            }
        }
        i = j;
    }

    skills.into_iter().collect()
}

/// Canonical vocabulary skills mentioned anywhere in the text, sorted.
pub fn match_vocabulary(text: &str) -> Vec<String> {
    let found: BTreeSet<&str> = ALIAS_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(canonical, _)| *canonical)
        .collect();
    found.into_iter().map(String::from).collect()
}

/// Per-skill hits: a years-of-use mention after the skill on the same line
/// (depth), and an advanced/expert/senior qualifier on that line (qualifier).
/// Each skill contributes at most one of each.
pub fn skill_hits(text: &str, skills: &[String]) -> (u32, u32) {
    let lines: Vec<String> = text.lines().map(str::to_lowercase).collect();
    let mut depth = 0;
    let mut qualifier = 0;

    for skill in skills {
        let needle = skill.to_lowercase();
        if needle.is_empty() {
            continue;
        }
        let mut has_depth = false;
        let mut has_qualifier = false;
        for line in &lines {
            let Some(pos) = line.find(&needle) else {
                continue;
            };
            has_depth |= YEARS_MENTION.is_match(&line[pos + needle.len()..]);
            has_qualifier |= QUALIFIER.is_match(line);
        }
        depth += u32::from(has_depth);
        qualifier += u32::from(has_qualifier);
    }

    (depth, qualifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_skills_inline_and_following_lines() {
        let text = "Summary\nGood person\nSkills: Python, SQL\nDocker; Kubernetes\nEducation\nBS Math, Physics";
        let skills = extract_section_skills(text, false);
        assert_eq!(skills, vec!["docker", "kubernetes", "python", "sql"]);
    }

    #[test]
    fn test_section_skills_stop_at_label_line() {
        let text = "Highlights\n- Payroll\n- Budgeting\nLanguages:\nSpanish";
        let skills = extract_section_skills(text, false);
        assert_eq!(skills, vec!["budgeting", "payroll"]);
    }

    #[test]
    fn test_section_skills_none_without_heading() {
        assert!(extract_section_skills("Python, SQL, Docker", false).is_empty());
    }

    #[test]
    fn test_vocabulary_matches_aliases() {
        let text = "Built services with Node.js, PostgreSQL and k8s. Some C++ too.";
        let skills = match_vocabulary(text);
        assert!(skills.contains(&"nodejs".to_string()));
        assert!(skills.contains(&"sql".to_string()));
        assert!(skills.contains(&"kubernetes".to_string()));
        assert!(skills.contains(&"c++".to_string()));
    }

    #[test]
    fn test_vocabulary_respects_token_boundaries() {
        let skills = match_vocabulary("Javanese cuisine and trust funds");
        assert!(!skills.contains(&"java".to_string()));
        assert!(!skills.contains(&"rust".to_string()));
    }

    #[test]
    fn test_canonical_skill() {
        assert_eq!(canonical_skill(" ReactJS "), "react");
        assert_eq!(canonical_skill("Welding"), "welding");
    }

    #[test]
    fn test_skill_hits() {
        let text = "Python - 5 years\nExpert in SQL\nJava";
        let skills = vec!["python".to_string(), "sql".to_string(), "java".to_string()];
        assert_eq!(skill_hits(text, &skills), (1, 1));
    }
}
