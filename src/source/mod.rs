// Remote data source — HTTP client and endpoint layout.

pub mod http_source;
