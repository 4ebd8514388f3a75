pub mod data_client;
pub mod fetcher;
pub mod paginator;
pub mod subgraph_client;
pub mod transport;
pub mod types;

pub use data_client::DataClient;
pub use fetcher::Fetcher;
pub use paginator::{Page, PageCursor, PageEnd, PageLimits, PageRun, PagedResource, Paginator, RestResource};
pub use subgraph_client::SubgraphClient;
pub use transport::{ApiRequest, HttpTransport, RawResponse, Transport};
pub use types::{MergeEvent, RedemptionEvent, SplitEvent, ValueEntry};
