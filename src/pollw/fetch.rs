use std::time::Duration;

use crate::pollw::*;

/// The 2024 population estimates.
pub const IBGE_ESTIMATES_URL: &str =
    "https://ftp.ibge.gov.br/Estimativas_de_Populacao/Estimativas_2024/estimativa_dou_2024.xls";

#[derive(Debug, Snafu)]
pub enum FetchError {
    #[snafu(display("could not build the HTTP client"))]
    Client { source: reqwest::Error },
    #[snafu(display("request to {url} failed"))]
    Request { source: reqwest::Error, url: String },
    #[snafu(display("{url} answered with status {status}"))]
    Status { url: String, status: u16 },
    #[snafu(display("could not read {path}"))]
    ReadFile {
        source: std::io::Error,
        path: String,
    },
}

/// Where the spreadsheet bytes come from.
pub trait SpreadsheetSource {
    fn fetch(&self) -> Result<Vec<u8>, FetchError>;
    fn describe(&self) -> String;
}

/// A single unauthenticated GET, without retry.
#[derive(Debug, Clone)]
pub struct HttpSource {
    pub url: String,
    pub timeout: Duration,
}

impl SpreadsheetSource for HttpSource {
    fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .context(ClientSnafu {})?;
        info!("fetch: downloading {}", self.url);
        let resp = client
            .get(&self.url)
            .send()
            .context(RequestSnafu { url: &self.url })?;
        let status = resp.status();
        if !status.is_success() {
            return StatusSnafu {
                url: &self.url,
                status: status.as_u16(),
            }
            .fail();
        }
        let bytes = resp.bytes().context(RequestSnafu { url: &self.url })?;
        debug!("fetch: received {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

#[derive(Debug, Clone)]
pub struct LocalFileSource {
    pub path: PathBuf,
}

impl SpreadsheetSource for LocalFileSource {
    fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        fs::read(&self.path).context(ReadFileSnafu {
            path: self.path.display().to_string(),
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// An HTTP source for URLs, a local file otherwise.
pub fn source_for(location: &str, timeout: Duration) -> Box<dyn SpreadsheetSource> {
    if is_remote(location) {
        Box::new(HttpSource {
            url: location.to_string(),
            timeout,
        })
    } else {
        Box::new(LocalFileSource {
            path: PathBuf::from(location),
        })
    }
}
