//! Per-entity lanes: the state each lane carries and the trait that lets the
//! controller drive users and products through one code path.

use std::fmt;

use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{Product, ProductDraft, User, UserDraft},
    protocol::{CreateProductRequest, CreateUserRequest},
};

use crate::{
    config::{PricePolicy, ServiceEndpoints},
    error::RequestError,
    store::ControllerSnapshot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneKind {
    Users,
    Products,
}

impl fmt::Display for LaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Users => "users",
            Self::Products => "products",
        })
    }
}

/// Fetch lifecycle of a lane. `Loaded` and `Failed` only move back to
/// `Loading` on an explicit fetch, retry or post-create reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaneStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaneState<R: Resource> {
    /// Last successfully fetched list, in server order.
    pub items: Vec<R>,
    pub draft: R::Draft,
    pub status: LaneStatus,
    pub loading: bool,
    pub submitting: bool,
    pub error: Option<String>,
}

impl<R: Resource> Default for LaneState<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            draft: R::Draft::default(),
            status: LaneStatus::Idle,
            loading: false,
            submitting: false,
            error: None,
        }
    }
}

impl<R: Resource> LaneState<R> {
    pub fn display_lines(&self) -> Vec<String> {
        self.items.iter().map(R::display_line).collect()
    }
}

pub trait Resource:
    DeserializeOwned + Clone + fmt::Debug + PartialEq + Send + Sync + 'static
{
    type Draft: Clone + Default + fmt::Debug + PartialEq + Send + Sync + 'static;
    type Request: Serialize + Send + Sync;

    const LANE: LaneKind;
    /// Key wrapping the record in a create response, e.g. `{"user": {...}}`.
    const ENVELOPE_KEY: &'static str;
    const NOUN: &'static str;

    fn url(endpoints: &ServiceEndpoints) -> &str;
    fn build_request(draft: &Self::Draft, policy: PricePolicy)
        -> Result<Self::Request, RequestError>;
    fn lane(snapshot: &ControllerSnapshot) -> &LaneState<Self>;
    fn lane_mut(snapshot: &mut ControllerSnapshot) -> &mut LaneState<Self>;
    fn name(&self) -> &str;
    fn display_line(&self) -> String;
}

impl Resource for User {
    type Draft = UserDraft;
    type Request = CreateUserRequest;

    const LANE: LaneKind = LaneKind::Users;
    const ENVELOPE_KEY: &'static str = "user";
    const NOUN: &'static str = "User";

    fn url(endpoints: &ServiceEndpoints) -> &str {
        &endpoints.users_url
    }

    fn build_request(
        draft: &UserDraft,
        _policy: PricePolicy,
    ) -> Result<CreateUserRequest, RequestError> {
        Ok(CreateUserRequest::from(draft))
    }

    fn lane(snapshot: &ControllerSnapshot) -> &LaneState<Self> {
        &snapshot.users
    }

    fn lane_mut(snapshot: &mut ControllerSnapshot) -> &mut LaneState<Self> {
        &mut snapshot.users
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn display_line(&self) -> String {
        User::display_line(self)
    }
}

impl Resource for Product {
    type Draft = ProductDraft;
    type Request = CreateProductRequest;

    const LANE: LaneKind = LaneKind::Products;
    const ENVELOPE_KEY: &'static str = "product";
    const NOUN: &'static str = "Product";

    fn url(endpoints: &ServiceEndpoints) -> &str {
        &endpoints.products_url
    }

    fn build_request(
        draft: &ProductDraft,
        policy: PricePolicy,
    ) -> Result<CreateProductRequest, RequestError> {
        let request = CreateProductRequest::from(draft);
        if policy == PricePolicy::RejectNonFinite && !request.price.is_finite() {
            return Err(RequestError::Validation(format!(
                "price must be a number, got '{}'",
                draft.price
            )));
        }
        Ok(request)
    }

    fn lane(snapshot: &ControllerSnapshot) -> &LaneState<Self> {
        &snapshot.products
    }

    fn lane_mut(snapshot: &mut ControllerSnapshot) -> &mut LaneState<Self> {
        &mut snapshot.products
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn display_line(&self) -> String {
        Product::display_line(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(price: &str) -> ProductDraft {
        ProductDraft {
            name: "Lamp".into(),
            description: "desk lamp".into(),
            price: price.into(),
        }
    }

    #[test]
    fn pass_through_keeps_nan_price() {
        let request =
            Product::build_request(&draft("abc"), PricePolicy::PassThrough).expect("request");
        assert!(request.price.is_nan());
    }

    #[test]
    fn strict_policy_rejects_nan_price() {
        let err = Product::build_request(&draft("abc"), PricePolicy::RejectNonFinite)
            .expect_err("must reject");
        assert_eq!(
            err,
            RequestError::Validation("price must be a number, got 'abc'".into())
        );

        let ok = Product::build_request(&draft("12.5"), PricePolicy::RejectNonFinite)
            .expect("finite price");
        assert_eq!(ok.price, 12.5);
    }

    #[test]
    fn default_lane_is_idle_and_empty() {
        let lane = LaneState::<User>::default();
        assert_eq!(lane.status, LaneStatus::Idle);
        assert!(lane.items.is_empty());
        assert_eq!(lane.draft, UserDraft::default());
        assert!(!lane.loading);
    }
}
