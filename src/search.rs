use crate::catalog::MenuCatalog;
use crate::model::{Item, LauncherId};
use crate::query::{Query, NO_MATCH};
use crate::run_action::RunAction;
use crate::search_action::SearchAction;
use crate::shell::PathLookup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Launcher(LauncherId),
    /// Index into the engine's search actions.
    SearchAction(usize),
    Run,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub rank: u32,
    pub kind: MatchKind,
}

/// Ranks launchers and ad hoc actions against the current query.
pub struct SearchEngine {
    query: Query,
    run_action: RunAction,
    search_actions: Vec<SearchAction>,
    path: Box<dyn PathLookup>,

    results: Vec<SearchMatch>,
    selected_index: usize,

    // Launchers that matched the previous query, for narrowing searches
    candidates: Vec<LauncherId>,
    candidates_revision: Option<u64>,
}

impl SearchEngine {
    pub fn new(search_actions: Vec<SearchAction>, path: Box<dyn PathLookup>) -> Self {
        Self {
            query: Query::default(),
            run_action: RunAction::new(),
            search_actions,
            path,
            results: Vec::new(),
            selected_index: 0,
            candidates: Vec::new(),
            candidates_revision: None,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Searches all launchers in `catalog` plus the ad hoc actions and
    /// returns the matches sorted by rank. Equal ranks keep name order.
    pub fn set_filter(&mut self, text: &str, catalog: &MenuCatalog) -> &[SearchMatch] {
        let previous = std::mem::take(&mut self.query);
        self.query.set(text);
        self.selected_index = 0;

        if self.query.is_empty() {
            self.results.clear();
            self.candidates.clear();
            self.candidates_revision = None;
            return &self.results;
        }

        let narrowing = self.candidates_revision == Some(catalog.revision())
            && self.query.narrows(&previous);
        let candidates = if narrowing {
            std::mem::take(&mut self.candidates)
        } else {
            catalog.all_items().launcher_ids()
        };

        let mut results = Vec::new();
        let mut matched = Vec::new();
        for id in candidates {
            let Some(launcher) = catalog.launcher(id) else {
                continue;
            };
            let rank = launcher.search(&self.query);
            if rank != NO_MATCH {
                results.push(SearchMatch { rank, kind: MatchKind::Launcher(id) });
                matched.push(id);
            }
        }
        self.candidates = matched;
        self.candidates_revision = Some(catalog.revision());

        for (i, action) in self.search_actions.iter_mut().enumerate() {
            let rank = action.search(&self.query);
            if rank != NO_MATCH {
                results.push(SearchMatch { rank, kind: MatchKind::SearchAction(i) });
            }
        }

        let rank = self.run_action.search(&self.query, self.path.as_ref());
        if rank != NO_MATCH {
            results.push(SearchMatch { rank, kind: MatchKind::Run });
        }

        results.sort_by_key(|result| result.rank);
        self.results = results;

        log::debug!("SearchEngine: query='{}', result_count={}", self.query.raw(), self.results.len());
        &self.results
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.results.clear();
        self.candidates.clear();
        self.candidates_revision = None;
        self.selected_index = 0;
    }

    pub fn results(&self) -> &[SearchMatch] {
        &self.results
    }

    pub fn item<'a>(&'a self, result: &SearchMatch, catalog: &'a MenuCatalog) -> Option<Item<'a>> {
        match result.kind {
            MatchKind::Launcher(id) => catalog.launcher(id).map(Item::Launcher),
            MatchKind::SearchAction(i) => self.search_actions.get(i).map(Item::Search),
            MatchKind::Run => Some(Item::Run(&self.run_action)),
        }
    }

    pub fn items<'a>(&'a self, catalog: &'a MenuCatalog) -> Vec<Item<'a>> {
        self.results
            .iter()
            .filter_map(|result| self.item(result, catalog))
            .collect()
    }

    /// The result at `index`, without the wrap-around of `move_selection`.
    pub fn nth<'a>(&'a self, index: usize, catalog: &'a MenuCatalog) -> Option<Item<'a>> {
        self.results
            .get(index)
            .and_then(|result| self.item(result, catalog))
    }

    pub fn move_selection(&mut self, delta: i32) {
        if self.results.is_empty() {
            self.selected_index = 0;
            return;
        }

        let len = self.results.len() as i32;
        let new_index = (self.selected_index as i32 + delta).rem_euclid(len);
        self.selected_index = new_index as usize;
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn selected<'a>(&'a self, catalog: &'a MenuCatalog) -> Option<Item<'a>> {
        self.results
            .get(self.selected_index)
            .and_then(|result| self.item(result, catalog))
    }
}
