//! # Services module
//!
//! This module provide services to interact with kubernetes and aws
//! documentdb, and the managed resource engine built on top of them.
pub mod aws;
pub mod cfg;
pub mod crd;
pub mod http;
pub mod k8s;
pub mod managed;
