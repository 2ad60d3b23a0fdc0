use crate::error::Result;
use crate::model::{Pagination, Product, ProductPage};
use crate::worker::{Intent, LoadState, Outcome, Request, Seq, Sequencer};
use tracing::{debug, error, info, warn};

pub const DELETE_FAILED: &str = "Failed to delete the product.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteState {
    None,
    Confirming(u64),
    Deleting(u64),
}

/// State behind the products screen: current page of records, pagination,
/// search text and the delete confirmation flow.
///
/// Every operation that changes a fetch input returns the [`Request`] that
/// must be dispatched; nothing here performs I/O.
pub struct ProductList {
    products: Vec<Product>,
    pagination: Pagination,
    // Pagination from the last successful response, restored when a fetch fails
    confirmed: Pagination,
    search: String,
    state: LoadState,
    delete: DeleteState,
    notice: Option<String>,
    list_seq: Sequencer,
    delete_seq: Sequencer,
}

impl ProductList {
    pub fn new() -> Self {
        Self {
            products: Vec::new(),
            pagination: Pagination::default(),
            confirmed: Pagination::default(),
            search: String::new(),
            state: LoadState::Idle,
            delete: DeleteState::None,
            notice: None,
            list_seq: Sequencer::default(),
            delete_seq: Sequencer::default(),
        }
    }

    pub fn mount(&mut self) -> Request {
        self.list_request()
    }

    fn list_request(&mut self) -> Request {
        self.state = LoadState::Loading;
        Request {
            seq: self.list_seq.issue(),
            intent: Intent::ListProducts {
                page: self.pagination.current_page,
                search: self.search.clone(),
            },
        }
    }

    pub fn set_search(&mut self, text: &str) -> Option<Request> {
        if self.search == text {
            return None;
        }
        self.search = text.to_string();
        Some(self.list_request())
    }

    /// Pages outside `1..=last_page`, and the page already shown, are ignored.
    pub fn request_page(&mut self, page: u32) -> Option<Request> {
        if !self.pagination.contains(page) || page == self.pagination.current_page {
            return None;
        }
        self.pagination.current_page = page;
        Some(self.list_request())
    }

    pub fn next_page(&mut self) -> Option<Request> {
        self.request_page(self.pagination.current_page.saturating_add(1))
    }

    pub fn previous_page(&mut self) -> Option<Request> {
        self.request_page(self.pagination.current_page.saturating_sub(1))
    }

    /// Applies a list response. Returns false when the response belongs to a
    /// superseded request and was dropped.
    pub fn apply_list(&mut self, seq: Seq, result: Result<ProductPage>) -> bool {
        if !self.list_seq.accept(seq) {
            debug!(seq, "dropping stale product list response");
            return false;
        }

        match result {
            Ok(page) => {
                self.pagination = page.pagination();
                self.confirmed = self.pagination;
                self.products = page.data;
                self.state = if self.products.is_empty() {
                    LoadState::Empty
                } else {
                    LoadState::Loaded { stale: false }
                };
            }
            Err(e) => {
                warn!(error = %e, "Error fetching products");
                self.pagination = self.confirmed;
                self.state = LoadState::Loaded { stale: true };
            }
        }
        true
    }

    pub fn open_delete(&mut self, id: u64) {
        if matches!(self.delete, DeleteState::Deleting(_)) {
            return;
        }
        self.delete = DeleteState::Confirming(id);
    }

    pub fn close_delete(&mut self) {
        if let DeleteState::Confirming(_) = self.delete {
            self.delete = DeleteState::None;
        }
    }

    pub fn confirm_delete(&mut self) -> Option<Request> {
        let DeleteState::Confirming(id) = self.delete else {
            return None;
        };
        self.delete = DeleteState::Deleting(id);
        Some(Request {
            seq: self.delete_seq.issue(),
            intent: Intent::DeleteProduct(id),
        })
    }

    /// On success the list is refetched from the server at the current page
    /// and search; rows are never removed locally.
    pub fn apply_delete(&mut self, seq: Seq, result: Result<()>) -> Option<Request> {
        if !self.delete_seq.accept(seq) {
            debug!(seq, "dropping stale delete response");
            return None;
        }
        let DeleteState::Deleting(id) = self.delete else {
            return None;
        };
        self.delete = DeleteState::None;

        match result {
            Ok(()) => {
                info!(id, "product deleted");
                Some(self.list_request())
            }
            Err(e) => {
                error!(id, error = %e, "Error deleting product");
                self.notice = Some(DELETE_FAILED.to_string());
                None
            }
        }
    }

    /// Routes a worker reply; may return a follow-up request.
    pub fn handle(&mut self, seq: Seq, outcome: Outcome) -> Option<Request> {
        match outcome {
            Outcome::Products(result) => {
                self.apply_list(seq, result);
                None
            }
            Outcome::Deleted(result) => self.apply_delete(seq, result),
            other => {
                warn!(?other, "product list ignored unrelated reply");
                None
            }
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn delete_state(&self) -> DeleteState {
        self.delete
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn has_previous(&self) -> bool {
        !self.pagination.is_first()
    }

    pub fn has_next(&self) -> bool {
        !self.pagination.is_last()
    }

    pub fn is_busy(&self) -> bool {
        self.list_seq.in_flight() || self.delete_seq.in_flight()
    }
}

impl Default for ProductList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::worker::tests::product;

    fn page(data: Vec<Product>, current: u32, last: u32) -> ProductPage {
        ProductPage {
            data,
            current_page: current,
            last_page: last,
            per_page: 10,
        }
    }

    fn failure() -> ApiError {
        ApiError::Parse("unexpected end of input".into())
    }

    /// Mounted list showing page `current` of `last`.
    fn loaded(current: u32, last: u32) -> ProductList {
        let mut list = ProductList::new();
        let req = list.mount();
        assert!(list.apply_list(req.seq, Ok(page(vec![product(1, "Widget")], current, last))));
        list
    }

    fn list_intent(req: &Request) -> (u32, &str) {
        match &req.intent {
            Intent::ListProducts { page, search } => (*page, search.as_str()),
            other => panic!("expected list intent, got {other:?}"),
        }
    }

    #[test]
    fn mount_fetches_first_page() {
        let mut list = ProductList::new();
        assert_eq!(list.state(), LoadState::Idle);
        let req = list.mount();
        assert_eq!(list_intent(&req), (1, ""));
        assert_eq!(list.state(), LoadState::Loading);
        assert!(list.is_busy());
    }

    #[test]
    fn single_widget_scenario() {
        let mut list = ProductList::new();
        let req = list.mount();
        let body: ProductPage = serde_json::from_value(serde_json::json!({
            "data": [{"id": 1, "name": "Widget", "price": 9.99, "quantity": 5, "description": "x"}],
            "current_page": 1, "last_page": 1, "per_page": 10
        }))
        .unwrap();
        list.apply_list(req.seq, Ok(body));

        assert_eq!(list.state(), LoadState::Loaded { stale: false });
        assert_eq!(list.products().len(), 1);
        assert_eq!(list.products()[0].name, "Widget");
        assert_eq!(list.pagination().current_page, 1);
        assert_eq!(list.pagination().last_page, 1);
        assert!(!list.has_previous());
        assert!(!list.has_next());
    }

    #[test]
    fn every_valid_page_becomes_current() {
        for target in 1..=5 {
            let mut list = loaded(3, 5);
            match list.request_page(target) {
                Some(req) => {
                    assert_eq!(list_intent(&req).0, target);
                    assert_eq!(list.pagination().current_page, target);
                    list.apply_list(req.seq, Ok(page(vec![product(1, "a")], target, 5)));
                }
                // Page 3 is already shown
                None => assert_eq!(target, 3),
            }
            assert_eq!(list.pagination().current_page, target);
        }
    }

    #[test]
    fn out_of_range_pages_are_no_ops() {
        let mut list = loaded(1, 3);
        let before = (list.pagination(), list.state(), list.products().to_vec());

        assert!(list.request_page(0).is_none());
        assert!(list.request_page(4).is_none());
        assert!(list.previous_page().is_none());

        assert_eq!((list.pagination(), list.state(), list.products().to_vec()), before);
        assert!(!list.is_busy());
    }

    #[test]
    fn next_stops_at_last_page() {
        let mut list = loaded(3, 3);
        assert!(!list.has_next());
        assert!(list.next_page().is_none());
        let req = list.previous_page().unwrap();
        assert_eq!(list_intent(&req).0, 2);
    }

    #[test]
    fn empty_response_shows_empty_state() {
        let mut list = ProductList::new();
        let req = list.mount();
        list.apply_list(req.seq, Ok(page(vec![], 1, 0)));

        assert_eq!(list.state(), LoadState::Empty);
        assert!(list.products().is_empty());
        assert_eq!(list.pagination().last_page, 1);
        assert!(!list.has_previous());
        assert!(!list.has_next());
    }

    #[test]
    fn search_refetches_with_current_page() {
        let mut list = loaded(2, 4);
        let req = list.set_search("bolt").unwrap();
        assert_eq!(list_intent(&req), (2, "bolt"));
        assert_eq!(list.search(), "bolt");
        // Unchanged text does not fetch again
        assert!(list.set_search("bolt").is_none());
    }

    #[test]
    fn failed_fetch_keeps_previous_rows_and_page() {
        let mut list = loaded(1, 3);
        let req = list.request_page(2).unwrap();
        assert_eq!(list.pagination().current_page, 2);

        assert!(list.apply_list(req.seq, Err(failure())));
        assert_eq!(list.state(), LoadState::Loaded { stale: true });
        assert_eq!(list.products()[0].name, "Widget");
        assert_eq!(list.pagination().current_page, 1);
    }

    #[test]
    fn late_response_for_older_request_is_dropped() {
        let mut list = loaded(1, 5);
        let first = list.request_page(2).unwrap();
        let second = list.request_page(3).unwrap();

        // Newest lands first, then the superseded one
        assert!(list.apply_list(second.seq, Ok(page(vec![product(3, "three")], 3, 5))));
        assert!(!list.apply_list(first.seq, Ok(page(vec![product(2, "two")], 2, 5))));

        assert_eq!(list.pagination().current_page, 3);
        assert_eq!(list.products()[0].name, "three");
    }

    #[test]
    fn older_response_arriving_first_is_dropped_too() {
        let mut list = loaded(1, 5);
        let first = list.set_search("a").unwrap();
        let second = list.set_search("ab").unwrap();

        assert!(!list.apply_list(first.seq, Ok(page(vec![product(2, "a")], 1, 5))));
        assert_eq!(list.state(), LoadState::Loading);
        assert!(list.apply_list(second.seq, Ok(page(vec![], 1, 1))));
        assert_eq!(list.state(), LoadState::Empty);
    }

    #[test]
    fn delete_confirmation_can_be_cancelled() {
        let mut list = loaded(1, 1);
        list.open_delete(1);
        assert_eq!(list.delete_state(), DeleteState::Confirming(1));
        list.close_delete();
        assert_eq!(list.delete_state(), DeleteState::None);
        assert!(list.confirm_delete().is_none());
    }

    #[test]
    fn successful_delete_refetches_current_page_and_search() {
        let mut list = loaded(2, 3);
        let req = list.set_search("wid").unwrap();
        list.apply_list(req.seq, Ok(page(vec![product(4, "widget")], 2, 3)));

        list.open_delete(4);
        let req = list.confirm_delete().unwrap();
        assert_eq!(req.intent, Intent::DeleteProduct(4));
        assert_eq!(list.delete_state(), DeleteState::Deleting(4));

        let refetch = list.apply_delete(req.seq, Ok(())).unwrap();
        assert_eq!(list_intent(&refetch), (2, "wid"));
        assert_eq!(list.delete_state(), DeleteState::None);
        // Row stays until the server says otherwise
        assert_eq!(list.products()[0].id, 4);

        list.apply_list(refetch.seq, Ok(page(vec![product(5, "widget 2")], 2, 3)));
        assert!(list.products().iter().all(|p| p.id != 4));
    }

    #[test]
    fn failed_delete_raises_notice_and_keeps_row() {
        let mut list = loaded(1, 1);
        list.open_delete(1);
        let req = list.confirm_delete().unwrap();

        assert!(list.apply_delete(req.seq, Err(failure())).is_none());
        assert_eq!(list.delete_state(), DeleteState::None);
        assert_eq!(list.notice(), Some(DELETE_FAILED));
        assert_eq!(list.products()[0].id, 1);

        list.dismiss_notice();
        assert_eq!(list.notice(), None);
    }

    #[test]
    fn handle_routes_replies() {
        let mut list = ProductList::new();
        let req = list.mount();
        let follow_up = list.handle(
            req.seq,
            Outcome::Products(Ok(page(vec![product(1, "Widget")], 1, 1))),
        );
        assert!(follow_up.is_none());
        assert_eq!(list.products().len(), 1);

        list.open_delete(1);
        let del = list.confirm_delete().unwrap();
        let refetch = list.handle(del.seq, Outcome::Deleted(Ok(())));
        assert!(matches!(refetch, Some(Request { intent: Intent::ListProducts { .. }, .. })));
    }

    #[test]
    fn delete_in_progress_ignores_new_confirmation() {
        let mut list = loaded(1, 1);
        list.open_delete(1);
        let _req = list.confirm_delete().unwrap();
        list.open_delete(2);
        assert_eq!(list.delete_state(), DeleteState::Deleting(1));
        assert!(list.confirm_delete().is_none());
    }
}
