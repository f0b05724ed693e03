pub mod cards;
pub mod chart;
pub mod collate;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod export;
pub mod filter;
pub mod limits;
pub mod map;
pub mod model;
pub mod options;
pub mod table;
pub mod views;

pub use cards::{CardStats, CardsPanel};
pub use chart::{Bar, ProgressBand, ProgressSummary, SubregionChart};
pub use config::{DashboardConfig, Extent};
pub use dataset::DataStore;
pub use engine::{Catalog, ConsumerId, FilterEngine, Phase, Propagation};
pub use error::{ConfigError, DatasetError, ExportError, FilterError, ViewError};
pub use filter::{FilterField, FilterState, FilterTag, FilterUpdate, TagKind};
pub use map::{MapHighlight, MapSync};
pub use model::Record;
pub use options::OptionIndex;
pub use table::TableModel;
pub use views::{Consumer, HighlightField, MapView, Subset};
