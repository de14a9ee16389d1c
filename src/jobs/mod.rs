pub mod reconcile;

pub use reconcile::{reconcile_totals, ReconcileReport};
