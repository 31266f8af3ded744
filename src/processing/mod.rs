//! In-memory dataset transformations.
//!
//! Both stages are pure: they take a [`crate::types::DataSet`] by reference and return a new
//! one.
//!
//! - [`clean()`]: drop rows with missing values, then drop duplicate rows
//! - [`normalize()`]: project onto a [`crate::catalog::TargetSchema`], applying coercion rules
//!
//! ## Example: clean → normalize
//!
//! ```rust
//! use zone_curation::catalog::DatasetKind;
//! use zone_curation::processing::{clean, normalize};
//! use zone_curation::types::{DataSet, Schema, Value};
//!
//! let raw = DataSet::new(
//!     Schema::utf8(["cliente_id", "tipo_identificacion", "nombre", "ciudad"]),
//!     vec![
//!         vec![Value::text("1"), Value::text("CC"), Value::text("Juan PEREZ"), Value::text("Cali")],
//!         vec![Value::text("1"), Value::text("CC"), Value::text("Juan PEREZ"), Value::text("Cali")],
//!         vec![Value::text("2"), Value::Null, Value::text("Ana"), Value::text("Cali")],
//!     ],
//! );
//!
//! let cleaned = clean(&raw);
//! assert_eq!(cleaned.row_count(), 1);
//!
//! let curated = normalize(&cleaned, &DatasetKind::Customers.target_schema()).unwrap();
//! assert_eq!(curated.rows[0][2], Value::text("juan perez"));
//! ```

pub mod clean;
pub mod normalize;

pub use clean::{CleanStats, clean, clean_with_stats, drop_duplicates, drop_missing};
pub use normalize::{coerce, normalize, output_schema};
