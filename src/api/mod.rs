pub mod error;
pub mod http;
pub mod overpass;
pub mod panoramax;

pub use error::FetchError;
pub use http::{HttpConfig, HttpTransport, Transport};
pub use overpass::{Element, OverpassConfig, OverpassResponse, PoiService};
pub use panoramax::{ImageryService, PanoramaxConfig};
