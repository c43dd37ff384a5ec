//! Curated question/answer table and the fuzzy matcher over it.
//!
//! The table is static, loaded once at startup, and keys are stored
//! pre-lowercased. Matching is approximate: the incoming text is scored
//! against every key and the best candidate wins if it clears the cutoff.
//! Answers are returned verbatim, never interpolated.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CuratedEntry {
    pub key: String,
    pub answer: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KnowledgeError {
    #[error("duplicate curated key: `{0}`")]
    DuplicateKey(String),
    #[error("curated key must be lowercase: `{0}`")]
    KeyNotLowercase(String),
    #[error("curated key must not be empty")]
    EmptyKey,
}

#[derive(Clone, Debug, Default)]
pub struct KnowledgeBase {
    entries: Vec<CuratedEntry>,
}

impl KnowledgeBase {
    /// Build a table, failing fast on empty, duplicate, or non-lowercase keys.
    pub fn from_entries<I, K, V>(pairs: I) -> Result<Self, KnowledgeError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        for (key, answer) in pairs {
            let key = key.into();
            if key.trim().is_empty() {
                return Err(KnowledgeError::EmptyKey);
            }
            if key != key.to_lowercase() {
                return Err(KnowledgeError::KeyNotLowercase(key));
            }
            if !seen.insert(key.clone()) {
                return Err(KnowledgeError::DuplicateKey(key));
            }
            entries.push(CuratedEntry { key, answer: answer.into() });
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CuratedEntry] {
        &self.entries
    }

    /// Best approximate match for `text` among the curated keys.
    ///
    /// Highest ratio wins; on exact ties the earlier entry wins. Returns the
    /// stored answer untouched, or `None` when nothing clears the cutoff.
    pub fn best_match<S: SimilarityScorer + ?Sized>(
        &self,
        text: &str,
        scorer: &S,
        cutoff: f64,
    ) -> Option<&str> {
        let lowered = text.to_lowercase();
        let mut best: Option<(&CuratedEntry, f64)> = None;

        for entry in &self.entries {
            let ratio = scorer.score(&lowered, &entry.key);
            if ratio < cutoff {
                continue;
            }
            let beats_current = best.map(|(_, current)| ratio > current).unwrap_or(true);
            if beats_current {
                best = Some((entry, ratio));
            }
        }

        best.map(|(entry, _)| entry.answer.as_str())
    }

    /// The helpdesk table shipped with the original Avertra deployment.
    pub fn builtin() -> Self {
        Self::from_entries([
            (
                "what is the leave policy",
                "Avertra provides 12 sick and 12 casual leaves annually.",
            ),
            (
                "who do i contact for it issues",
                "Please email it.support@avertra.com or message #it-helpdesk.",
            ),
            (
                "what is avertra’s vision",
                "“Simplify Utility Innovation” is Avertra’s long-term vision.",
            ),
            (
                "how do i request an id card re-issue",
                "Use the ID Card Form from the HR Portal or type `id card` here.",
            ),
            (
                "where can i find the holiday calendar",
                "Visit SharePoint > HR Documents > Holiday Calendar 2025.",
            ),
            (
                "who is the head of sap department",
                "The SAP department head is Mr. Khurram Siddique.",
            ),
            (
                "how do i claim medical reimbursement",
                "Use the form on Intranet > Finance > Claims → Upload bills.",
            ),
            ("what is the company dress code", "Smart casuals on weekdays, formals on Mondays."),
            (
                "how do i get access to sap dev system",
                "Raise a request at sapaccess@avertra.com with your manager in CC.",
            ),
            (
                "what is the organization structure",
                "You can view the org chart in HR Portal > Org Chart.",
            ),
            (
                "how to apply for leave",
                "Please access the following PTO link to apply for your leave: https://docs.google.com/spreadsheets/d/10ilz4TLd1KzsqzRTp6kvydV96-kZuN6inslLmxnx7p8/edit?gid=61543925#gid=61543925",
            ),
            (
                "byd link",
                "https://my335994.sapbydesign.com/sap/public/ap/ui/repository/SAP_UI/HTMLOBERON5/client.html?",
            ),
            ("who is the payroll vendor for avertra", "Payline India"),
            (
                "what is the payroll portal link for indian employees in avertra",
                "URL: https://avertra.paylineindia.com. Log in with your ESS credentials.",
            ),
            (
                "what are the current ongoing projects in the sap department",
                "NTUA AMS, NTUA SuccessFactors Implementation Project, and Aramex.",
            ),
            ("who is the founder of avertra", "Mr. Giancarlo Reyes"),
            ("who is the ceo/cto of avertra", "Mr. Bashir Bseirani"),
            (
                "what is avertra",
                "Since 2007, Avertra has been driven by one mission: to simplify life. Over the years, we've expanded our reach across many cultures and geographies, ultimately recognizing that people share core needs—from access to trusted digital services to clean water and stable power. Guided by its diverse perspectives and foundational pillars—empathy, science, strategy, and technology—we create experiences that empower communities and connect people to what matters most.",
            ),
            ("what is the avertra website link", "https://avertra.com"),
            (
                "can you brief us on a few success stories of avertra",
                "Yes, please use the URL below to access Avertra's success stories: https://avertra.com/category/success-stories/",
            ),
            (
                "what is the ai initiative program in the sap department",
                "The AI Initiative program in the SAP department is a strategic effort aimed at exploring and defining artificial intelligence (AI) use cases that can significantly enhance the way we work. This includes identifying opportunities where AI can improve processes, enhance customer experiences, and support smarter decision-making within SAP operations. The program encourages collaboration among team members to share ideas, identify impactful use cases or projects, and explore tools and technologies that can be leveraged to implement or enhance AI-driven solutions.",
            ),
        ])
        .expect("builtin curated table must have unique lowercase keys")
    }
}

/// Pluggable similarity capability so the matching algorithm can be swapped
/// or tested independently of orchestration.
pub trait SimilarityScorer: Send + Sync {
    /// Similarity of `a` and `b` in `[0, 1]`.
    fn score(&self, a: &str, b: &str) -> f64;
}

/// Sequence-matching ratio: `2 * M / (len(a) + len(b))` where `M` is the
/// total size of matched blocks found by recursively taking the longest
/// common contiguous run and matching to its left and right.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequenceRatioScorer;

impl SimilarityScorer for SequenceRatioScorer {
    fn score(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        if a.is_empty() && b.is_empty() {
            return 1.0;
        }
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        let matched = total_matched(&a, &b);
        2.0 * matched as f64 / (a.len() + b.len()) as f64
    }
}

fn total_matched(a: &[char], b: &[char]) -> usize {
    let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, ch) in b.iter().enumerate() {
        positions.entry(*ch).or_default().push(j);
    }

    let mut total = 0;
    let mut regions = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = regions.pop() {
        let (i, j, size) = longest_match(a, &positions, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        total += size;
        regions.push((alo, i, blo, j));
        regions.push((i + size, ahi, j + size, bhi));
    }

    total
}

fn longest_match(
    a: &[char],
    positions: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0_usize);
    let mut run_lengths: HashMap<usize, usize> = HashMap::new();

    for i in alo..ahi {
        let mut next_runs: HashMap<usize, usize> = HashMap::new();
        if let Some(slots) = positions.get(&a[i]) {
            for &j in slots {
                if j < blo || j >= bhi {
                    continue;
                }
                let run =
                    if j > 0 { run_lengths.get(&(j - 1)).copied().unwrap_or(0) + 1 } else { 1 };
                next_runs.insert(j, run);
                if run > best.2 {
                    best = (i + 1 - run, j + 1 - run, run);
                }
            }
        }
        run_lengths = next_runs;
    }

    best
}
