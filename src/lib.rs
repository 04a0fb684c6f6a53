//! Tenant control plane status model
//!
//! This crate provides the observed-state ledger a reconciler uses to drive a
//! virtualized, multi-tenant Kubernetes control plane towards convergence:
//! certificates, storage backends, kubeconfigs, kubeadm phases, the managed
//! Deployment/Service/Ingress, and addons.

pub mod checksum;
pub mod crd;
pub mod error;
pub mod persistence;

pub use crate::error::{Error, Result};
