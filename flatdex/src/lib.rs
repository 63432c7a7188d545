//! flatdex: secondary indexes for flat-file tables
//!
//! This crate is the entrypoint for the flatdex workspace. It re-exports the
//! index engine and the index-file backends under one API surface.
//!
//! # Quick Start
//!
//! Index an Arrow batch and look a key up:
//!
//! ```rust
//! use std::sync::Arc;
//! use arrow::array::Int32Array;
//! use arrow::datatypes::{DataType, Field, Schema};
//! use arrow::record_batch::RecordBatch;
//! use flatdex::{
//!     BatchRowSource, Fetch, Index, IndexConfig, IndexCursor, IndexDefinition,
//!     KeyPartDefinition, KeyValue, SeekOp,
//! };
//!
//! let schema = Arc::new(Schema::new(vec![Field::new("k", DataType::Int32, false)]));
//! let batch = RecordBatch::try_new(
//!     schema,
//!     vec![Arc::new(Int32Array::from(vec![30, 10, 20, 10, 30]))],
//! )
//! .unwrap();
//!
//! let definition =
//!     IndexDefinition::new("by_k", 0, false, vec![KeyPartDefinition::new("k")]).unwrap();
//! let mut source = BatchRowSource::new(batch);
//! let mut index = Index::build(&definition, &mut source, IndexConfig::default()).unwrap();
//! assert_eq!(index.num_distinct(), 3);
//!
//! index.set_probe(&[KeyValue::Int32(20)]).unwrap();
//! index.seek(SeekOp::Eq);
//! assert_eq!(index.fetch(), Fetch::Row(2));
//! ```
//!
//! # Architecture
//!
//! flatdex is organized as a layered workspace:
//!
//! - **Errors** (`flatdex-result`): the shared error enum.
//! - **Storage** (`flatdex-storage`): index-file backends and the shared-file slot directory.
//! - **Index** (`flatdex-index`): definitions, build, lookup, persistence.

pub use flatdex_index::*;
pub use flatdex_result::{Error, Result};

pub mod storage {
    //! Index-file backends.
    //!
    //! Every backend implements [`IndexFile`]; [`open_index_file`] picks one
    //! from a [`FileBackend`].

    pub use flatdex_storage::file::{
        BufferedIndexFile, HugeIndexFile, InstrumentedIndexFile, IoStats, IoStatsSnapshot,
        MemFileSystem, MemIndexFile,
    };
    pub use flatdex_storage::{FileBackend, FileOffset, IndexFile, IndexSlot, OpenMode, open_index_file};
}
