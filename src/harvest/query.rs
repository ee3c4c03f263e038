use std::fmt;

use serde::{Deserialize, Serialize};

use super::pacer::PaceClass;
use crate::backend::BackendKind;
use crate::config::{CategoryProfile, Profiles, Subject};

const SUBJECT_PLACEHOLDER: &str = "{subject}";

/// Why a query is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    CounterfeitNews,
    PhishingNews,
    AnnualReport,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::CounterfeitNews => "CounterfeitNews",
            Category::PhishingNews => "PhishingNews",
            Category::AnnualReport => "AnnualReport",
        }
    }

    pub fn all() -> &'static [Category] {
        &[
            Category::CounterfeitNews,
            Category::PhishingNews,
            Category::AnnualReport,
        ]
    }

    pub fn parse(s: &str) -> Option<Category> {
        Self::all()
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One search to perform for every subject: the query template, the vertical
/// it goes to and the per-call result cap.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub template: String,
    pub category: Category,
    pub backend: BackendKind,
    pub result_limit: usize,
}

impl QuerySpec {
    pub fn from_profile(category: Category, profile: &CategoryProfile) -> Self {
        let mut template = format!("\"{SUBJECT_PLACEHOLDER}\"");
        let keywords = profile.keywords.trim();
        if !keywords.is_empty() {
            template.push(' ');
            template.push_str(keywords);
        }
        if let Some(ext) = profile.filetype.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            template.push_str(&format!(" filetype:{ext}"));
        }
        Self {
            template,
            category,
            backend: profile.backend,
            result_limit: profile.result_limit,
        }
    }

    /// Substitutes the subject as an exact-phrase token. Embedded quotes are
    /// dropped so the phrase stays balanced.
    pub fn render(&self, subject: &str) -> String {
        let phrase: String = subject.chars().filter(|c| *c != '"').collect();
        self.template.replace(SUBJECT_PLACEHOLDER, phrase.trim())
    }

    pub fn pace_class(&self) -> PaceClass {
        match self.backend {
            BackendKind::Filetype => PaceClass::Document,
            BackendKind::News | BackendKind::Text => PaceClass::Search,
        }
    }
}

/// A (subject, query) cell of the harvest matrix.
#[derive(Debug, Clone, Copy)]
pub struct Cell<'a> {
    /// Zero-based position of the subject in the run.
    pub subject_index: usize,
    pub subject: &'a Subject,
    pub spec: &'a QuerySpec,
}

impl Cell<'_> {
    pub fn query(&self) -> String {
        self.spec.render(&self.subject.name)
    }

    pub fn opens_subject(&self, specs: &[QuerySpec]) -> bool {
        specs.first().is_some_and(|first| std::ptr::eq(first, self.spec))
    }
}

/// Subjects and query specs for one run, fixed before the first call.
#[derive(Debug, Clone)]
pub struct HarvestPlan {
    pub subjects: Vec<Subject>,
    pub specs: Vec<QuerySpec>,
}

impl HarvestPlan {
    pub fn new(subjects: Vec<Subject>, categories: &[Category], profiles: &Profiles) -> Self {
        let specs = categories
            .iter()
            .map(|&category| QuerySpec::from_profile(category, profiles.get(category)))
            .collect();
        Self { subjects, specs }
    }

    /// Cells in harvest order: subjects in list order, categories in
    /// configured order within each subject.
    pub fn cells(&self) -> impl Iterator<Item = Cell<'_>> {
        self.subjects
            .iter()
            .enumerate()
            .flat_map(move |(subject_index, subject)| {
                self.specs.iter().map(move |spec| Cell {
                    subject_index,
                    subject,
                    spec,
                })
            })
    }

    pub fn len(&self) -> usize {
        self.subjects.len() * self.specs.len()
    }
}
