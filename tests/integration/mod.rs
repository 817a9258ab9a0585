//! Integration tests for catalogue reconciliation and materialization

mod download_flow;
mod harvest_flow;
mod hash_properties;
mod merge_scenarios;
mod store_roundtrip;
mod support;
