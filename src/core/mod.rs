//! Core business logic - Write paths, guards and queries over the entities.
//!
//! Every mutation of a row goes through a function in this module tree so that
//! validation, immutability guards and counter maintenance run on every path.
//! Functions are framework-agnostic: callers supply the database connection and,
//! where forensic fields are stored, a [`audit::RequestContext`].

pub mod analytics;
pub mod audit;
pub mod campaign;
pub mod company;
pub mod corporate_action;
pub mod counters;
pub mod deal;
pub mod feature_flag;
pub mod feedback;
pub mod guards;
pub mod investment;
pub mod kyc;
pub mod legal;
pub mod morph;
pub mod notification;
pub mod payment;
pub mod referral;
pub mod saga;
pub mod sector;
pub mod slug;
pub mod support;
pub mod user;
