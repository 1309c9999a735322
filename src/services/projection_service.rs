use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::candidate::Candidate;
use crate::models::round::Round;
use crate::services::collection_service::Collections;
use crate::utils::time::{elapsed_seconds, format_wait_time};

const KNOWN_SOURCES: [&str; 4] = ["linkedin", "naukri", "website", "referral"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperienceBucket {
    ZeroToTwo,
    ThreeToFive,
    SixToTen,
    OverTen,
}

impl ExperienceBucket {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim() {
            "0-2" => Ok(Self::ZeroToTwo),
            "3-5" => Ok(Self::ThreeToFive),
            "6-10" => Ok(Self::SixToTen),
            "10+" => Ok(Self::OverTen),
            other => Err(Error::BadRequest(format!("Unknown experience bucket: {}", other))),
        }
    }

    /// Bounds are whole years, inclusive on both ends; `10+` starts above ten.
    pub fn contains(&self, years: Decimal) -> bool {
        let (low, high) = match self {
            Self::ZeroToTwo => (0, Some(2)),
            Self::ThreeToFive => (3, Some(5)),
            Self::SixToTen => (6, Some(10)),
            Self::OverTen => return years > Decimal::from(10),
        };
        years >= Decimal::from(low) && high.map_or(true, |h| years <= Decimal::from(h))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFilter {
    Named(String),
    /// Anything outside the well-known sources.
    Others,
}

impl SourceFilter {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("others") {
            Self::Others
        } else {
            Self::Named(raw.trim().to_string())
        }
    }

    fn matches(&self, source: Option<&str>) -> bool {
        match self {
            Self::Named(name) => source.map_or(false, |s| s.contains(name.as_str())),
            Self::Others => {
                let source = source.unwrap_or("").trim().to_ascii_lowercase();
                !KNOWN_SOURCES.contains(&source.as_str())
            }
        }
    }
}

/// Creation-date window. `Week` and `Month` count elapsed whole days back
/// from now rather than calendar boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    Today,
    Week,
    Month,
}

impl DateFilter {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(Error::BadRequest(format!("Unknown date filter: {}", other))),
        }
    }

    fn matches(&self, created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(created_at) = created_at else { return false };
        match self {
            Self::Today => created_at.date_naive() == now.date_naive(),
            Self::Week => (now - created_at).num_days() <= 7,
            Self::Month => (now - created_at).num_days() <= 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateFilter {
    pub search: Option<String>,
    pub job: Option<String>,
    pub status: Option<String>,
    pub experience: Option<ExperienceBucket>,
    pub source: Option<SourceFilter>,
    pub round: Option<Round>,
    pub interview_type: Option<String>,
    pub date: Option<DateFilter>,
}

impl CandidateFilter {
    /// Conjunction of every active criterion.
    pub fn matches(&self, candidate: &Candidate, now: DateTime<Utc>) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = [&candidate.name, &candidate.email, &candidate.applied_position]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if let Some(job) = &self.job {
            if &candidate.applied_position != job {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if !candidate.final_status.as_str().eq_ignore_ascii_case(status) {
                return false;
            }
        }
        if let Some(bucket) = &self.experience {
            match candidate.experience_years() {
                Some(years) if bucket.contains(years) => {}
                _ => return false,
            }
        }
        if let Some(source) = &self.source {
            if !source.matches(candidate.source.as_deref()) {
                return false;
            }
        }
        if let Some(round) = &self.round {
            if candidate.last_interview_round != *round {
                return false;
            }
        }
        if let Some(kind) = &self.interview_type {
            if candidate.interview_type.as_deref() != Some(kind.as_str()) {
                return false;
            }
        }
        if let Some(date) = &self.date {
            if !date.matches(candidate.created_at, now) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectionKind {
    Unassigned,
    Assigned,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursors {
    pub unassigned: usize,
    pub assigned: usize,
    pub completed: usize,
}

impl Default for PageCursors {
    fn default() -> Self {
        Self {
            unassigned: 1,
            assigned: 1,
            completed: 1,
        }
    }
}

/// Filter values plus the three page cursors of a dashboard session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectionState {
    filter: CandidateFilter,
    cursors: PageCursors,
}

impl ProjectionState {
    pub fn new(filter: CandidateFilter) -> Self {
        Self {
            filter,
            cursors: PageCursors::default(),
        }
    }

    pub fn filter(&self) -> &CandidateFilter {
        &self.filter
    }

    pub fn cursors(&self) -> PageCursors {
        self.cursors
    }

    /// Replacing the filter with a different one sends every projection back to page 1.
    pub fn set_filter(&mut self, filter: CandidateFilter) {
        if filter != self.filter {
            self.filter = filter;
            self.cursors = PageCursors::default();
        }
    }

    pub fn set_page(&mut self, kind: ProjectionKind, page: usize) {
        let page = page.max(1);
        match kind {
            ProjectionKind::Unassigned => self.cursors.unassigned = page,
            ProjectionKind::Assigned => self.cursors.assigned = page,
            ProjectionKind::Completed => self.cursors.completed = page,
        }
    }

    /// Applies one dashboard request. A new filter wins over any page
    /// numbers sent with it; otherwise the given pages move their cursors
    /// and the rest stay where they were.
    pub fn apply(&mut self, filter: CandidateFilter, pages: &[(ProjectionKind, Option<usize>)]) {
        if filter != self.filter {
            self.set_filter(filter);
            return;
        }
        for (kind, page) in pages {
            if let Some(page) = page {
                self.set_page(*kind, *page);
            }
        }
    }
}

/// Projection state per dashboard user, kept across requests.
#[derive(Debug, Clone, Default)]
pub struct ProjectionSessions {
    inner: Arc<Mutex<HashMap<String, ProjectionState>>>,
}

impl ProjectionSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a request into the user's session and returns the result.
    pub fn view(
        &self,
        user: &str,
        filter: CandidateFilter,
        pages: &[(ProjectionKind, Option<usize>)],
    ) -> ProjectionState {
        let mut sessions = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let state = sessions.entry(user.to_string()).or_default();
        state.apply(filter, pages);
        state.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRow {
    #[serde(flatten)]
    pub candidate: Candidate,
    /// `H:MM:SS` since check-in, only for checked-in candidates.
    pub wait_time: Option<String>,
}

impl CandidateRow {
    fn new(candidate: &Candidate, now: DateTime<Utc>) -> Self {
        let mut candidate = candidate.clone();
        let wait_time = match (candidate.checked_in, candidate.check_in_time) {
            (true, Some(at)) => {
                candidate.wait_duration_minutes = elapsed_seconds(at, now) / 60;
                Some(format_wait_time(at, now))
            }
            _ => None,
        };
        Self {
            candidate,
            wait_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

impl<T: Clone> Page<T> {
    pub fn slice(all: &[T], page: usize, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let total = all.len();
        let total_pages = total.div_ceil(per_page);
        let page = page.clamp(1, total_pages.max(1));
        let items = all
            .iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .cloned()
            .collect();
        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

/// Filtered candidates split three ways. Every candidate lands in exactly one list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition<'a> {
    pub unassigned: Vec<&'a Candidate>,
    pub assigned: Vec<&'a Candidate>,
    pub completed: Vec<&'a Candidate>,
}

pub fn partition<'a>(
    collections: &'a Collections,
    filter: &CandidateFilter,
    now: DateTime<Utc>,
) -> Partition<'a> {
    let assigned_ids: HashSet<&str> = collections.assigned.iter().map(|c| c.id.as_str()).collect();
    let mut out = Partition::default();

    for candidate in collections.unassigned.iter().chain(collections.assigned.iter()) {
        if !filter.matches(candidate, now) {
            continue;
        }
        if candidate.is_completed() {
            out.completed.push(candidate);
        } else if assigned_ids.contains(candidate.id.as_str()) {
            out.assigned.push(candidate);
        } else {
            out.unassigned.push(candidate);
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projections {
    pub unassigned: Page<CandidateRow>,
    pub assigned: Page<CandidateRow>,
    pub completed: Page<CandidateRow>,
}

/// Derives the three paginated projections from the current collections.
/// Always recomputed from the given snapshot.
pub fn project(
    collections: &Collections,
    state: &ProjectionState,
    per_page: usize,
    now: DateTime<Utc>,
) -> Projections {
    let parts = partition(collections, state.filter(), now);
    let rows = |list: &[&Candidate]| -> Vec<CandidateRow> {
        list.iter().map(|c| CandidateRow::new(c, now)).collect()
    };
    let cursors = state.cursors();

    Projections {
        unassigned: Page::slice(&rows(&parts.unassigned), cursors.unassigned, per_page),
        assigned: Page::slice(&rows(&parts.assigned), cursors.assigned, per_page),
        completed: Page::slice(&rows(&parts.completed), cursors.completed, per_page),
    }
}
