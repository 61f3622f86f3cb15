use std::{
    collections::{BTreeSet, HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
};

use crate::{error::ClusterError, label::Label, space::ClickPoint};

/// The clicks received for one page and the labels ever reported for it.
#[derive(Debug, Default)]
pub struct PageStream {
    points: VecDeque<ClickPoint>,
    seen_labels: BTreeSet<Label>,
    max_history: Option<usize>,
}

impl PageStream {
    fn new(max_history: Option<usize>) -> Self {
        Self {
            max_history,
            ..Default::default()
        }
    }

    /// Appends a click and returns its index in the history.
    /// When the history is capped, the oldest clicks are dropped first.
    pub fn append(&mut self, point: ClickPoint) -> usize {
        self.points.push_back(point);
        if let Some(max) = self.max_history {
            while self.points.len() > max.max(1) {
                self.points.pop_front();
            }
        }
        self.points.len() - 1
    }

    /// A copy of the history, in arrival order.
    pub fn history(&self) -> Vec<ClickPoint> {
        self.points.iter().copied().collect()
    }

    /// A copy of the history as it would be after appending `point`.
    pub fn candidate(&self, point: ClickPoint) -> Vec<ClickPoint> {
        let skip = match self.max_history {
            Some(max) => (self.points.len() + 1).saturating_sub(max.max(1)),
            None => 0,
        };
        self.points
            .iter()
            .skip(skip)
            .copied()
            .chain(Some(point))
            .collect()
    }

    /// Records a label, returning `true` when it had never been seen for this page.
    pub fn record_label(&mut self, label: Label) -> bool {
        self.seen_labels.insert(label)
    }

    pub fn seen_labels(&self) -> &BTreeSet<Label> {
        &self.seen_labels
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

type SharedStream = Arc<Mutex<PageStream>>;

/// Locks a page. A page is only written once clustering succeeded, so the state behind
/// a lock poisoned by a panicking clustering is still consistent and is taken over.
fn lock(page: &SharedStream) -> MutexGuard<'_, PageStream> {
    page.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Rejects page identifiers that cannot name a page.
pub(crate) fn validate_page_id(page_id: &str) -> Result<(), ClusterError> {
    if page_id.is_empty() {
        return Err(ClusterError::InvalidInput("page identifier is empty".into()));
    }
    Ok(())
}

/// Per page click histories and seen labels.
///
/// Pages are created on first use. Each page has its own lock so that
/// work on one page never waits for another.
#[derive(Debug, Default)]
pub struct PageStreamStore {
    pages: RwLock<HashMap<String, SharedStream>>,
    max_history: Option<usize>,
}

impl PageStreamStore {
    /// Builds an empty store with unbounded page histories.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an empty store that keeps at most `max_history` clicks per page.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            pages: RwLock::default(),
            max_history: Some(max_history),
        }
    }

    /// Gets the page state, creating it if absent.
    fn page(&self, page_id: &str) -> Result<SharedStream, ClusterError> {
        validate_page_id(page_id)?;
        let pages = self.pages.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(stream) = pages.get(page_id) {
            return Ok(stream.clone());
        }
        drop(pages);
        let mut pages = self.pages.write().unwrap_or_else(PoisonError::into_inner);
        let stream = pages
            .entry(page_id.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(PageStream::new(self.max_history))));
        Ok(stream.clone())
    }

    /// Gets the page state if it exists.
    fn existing_page(&self, page_id: &str) -> Result<SharedStream, ClusterError> {
        self.pages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(page_id)
            .cloned()
            .ok_or_else(|| ClusterError::UnknownPage(page_id.to_owned()))
    }

    /// Runs `f` with exclusive access to the page state, creating the page if absent.
    /// Calls on the same page are serialized, calls on different pages are not.
    pub fn with_page<T, F>(&self, page_id: &str, f: F) -> Result<T, ClusterError>
    where
        F: FnOnce(&mut PageStream) -> Result<T, ClusterError>,
    {
        let page = self.page(page_id)?;
        let mut stream = lock(&page);
        f(&mut *stream)
    }

    /// Appends a click to the page history and returns its index.
    pub fn append(&self, page_id: &str, point: ClickPoint) -> Result<usize, ClusterError> {
        if !point.is_finite() {
            return Err(ClusterError::InvalidInput(format!(
                "coordinates must be finite, got ({}, {})",
                point.x, point.y
            )));
        }
        self.with_page(page_id, |stream| Ok(stream.append(point)))
    }

    /// A snapshot of the page history, in arrival order.
    pub fn history(&self, page_id: &str) -> Result<Vec<ClickPoint>, ClusterError> {
        let page = self.existing_page(page_id)?;
        let stream = lock(&page);
        Ok(stream.history())
    }

    /// Records a label for the page, returning `true` when it is seen for the first time.
    pub fn record_label(&self, page_id: &str, label: Label) -> Result<bool, ClusterError> {
        self.with_page(page_id, |stream| Ok(stream.record_label(label)))
    }

    /// A snapshot of the labels seen for the page.
    pub fn seen_labels(&self, page_id: &str) -> Result<BTreeSet<Label>, ClusterError> {
        let page = self.existing_page(page_id)?;
        let stream = lock(&page);
        Ok(stream.seen_labels().clone())
    }

    /// Number of pages seen so far.
    pub fn page_count(&self) -> usize {
        self.pages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use crate::store::*;

    #[test]
    fn test_append_returns_index() {
        let store = PageStreamStore::new();
        assert_eq!(Ok(0), store.append("home", ClickPoint::new(1., 2.)));
        assert_eq!(Ok(1), store.append("home", ClickPoint::new(3., 4.)));
        assert_eq!(Ok(0), store.append("about", ClickPoint::new(3., 4.)));
        assert_eq!(
            Ok(vec![ClickPoint::new(1., 2.), ClickPoint::new(3., 4.)]),
            store.history("home")
        );
    }

    #[test]
    fn test_append_rejects_non_finite() {
        let store = PageStreamStore::new();
        let result = store.append("home", ClickPoint::new(f64::NAN, 2.));
        assert!(matches!(result, Err(ClusterError::InvalidInput(_))));
        assert_eq!(Err(ClusterError::UnknownPage("home".into())), store.history("home"));
    }

    #[test]
    fn test_empty_page_id() {
        let store = PageStreamStore::new();
        let result = store.append("", ClickPoint::new(1., 2.));
        assert!(matches!(result, Err(ClusterError::InvalidInput(_))));
        let result = store.record_label("", 0);
        assert!(matches!(result, Err(ClusterError::InvalidInput(_))));
        assert_eq!(0, store.page_count());
    }

    #[test]
    fn test_page_usable_after_panic() {
        let store = Arc::new(PageStreamStore::new());
        store.append("home", ClickPoint::new(1., 2.)).unwrap();
        let panicking = store.clone();
        let result = thread::spawn(move || {
            panicking.with_page("home", |_| -> Result<(), ClusterError> { panic!("boom") })
        })
        .join();
        assert!(result.is_err());
        assert_eq!(Ok(1), store.append("home", ClickPoint::new(3., 4.)));
        assert_eq!(Ok(true), store.record_label("home", 0));
        assert_eq!(2, store.history("home").unwrap().len());
    }

    #[test]
    fn test_history_is_a_snapshot() {
        let store = PageStreamStore::new();
        store.append("home", ClickPoint::new(1., 2.)).unwrap();
        let snapshot = store.history("home").unwrap();
        store.append("home", ClickPoint::new(3., 4.)).unwrap();
        assert_eq!(1, snapshot.len());
        assert_eq!(2, store.history("home").unwrap().len());
    }

    #[test]
    fn test_record_label() {
        let store = PageStreamStore::new();
        assert_eq!(Ok(true), store.record_label("home", 0));
        assert_eq!(Ok(false), store.record_label("home", 0));
        assert_eq!(Ok(true), store.record_label("home", 2));
        assert_eq!(Ok(true), store.record_label("about", 0));
        assert_eq!(Ok(BTreeSet::from([0, 2])), store.seen_labels("home"));
    }

    #[test]
    fn test_unknown_page() {
        let store = PageStreamStore::new();
        assert_eq!(Err(ClusterError::UnknownPage("nope".into())), store.seen_labels("nope"));
    }

    #[test]
    fn test_max_history() {
        let store = PageStreamStore::with_max_history(2);
        for i in 0..5 {
            store.append("home", ClickPoint::new(i as f64, 0.)).unwrap();
        }
        assert_eq!(
            Ok(vec![ClickPoint::new(3., 0.), ClickPoint::new(4., 0.)]),
            store.history("home")
        );
    }

    #[test]
    fn test_candidate_matches_append() {
        let mut stream = PageStream::new(Some(3));
        for i in 0..4 {
            let candidate = stream.candidate(ClickPoint::new(i as f64, 1.));
            let index = stream.append(ClickPoint::new(i as f64, 1.));
            assert_eq!(candidate, stream.history());
            assert_eq!(candidate.len() - 1, index);
        }
    }

    #[test]
    fn test_concurrent_record_label() {
        let store = Arc::new(PageStreamStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || store.record_label("home", 7).unwrap())
            })
            .collect();
        let firsts = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&first| first)
            .count();
        assert_eq!(1, firsts);
    }

    #[test]
    fn test_concurrent_pages() {
        let store = Arc::new(PageStreamStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        let page = format!("page-{}", t % 4);
                        store.append(&page, ClickPoint::new(i as f64, t as f64)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(4, store.page_count());
        for p in 0..4 {
            assert_eq!(200, store.history(&format!("page-{}", p)).unwrap().len());
        }
    }
}
