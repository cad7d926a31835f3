use std::cell::RefCell;
use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::data_handling::SequenceProvider;
use crate::error::{RankerError, RankerResult};
use crate::models::{ExonKey, GeneInfo};

const MAX_ATTEMPTS: u32 = 3;

pub struct ApiHandler {
    client: Client,
    base_url: String,
}

impl ApiHandler {
    pub fn new(base_url: &str) -> RankerResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("guide_ranker/0.1"));

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> RankerResult<T> {
        let response = self.send_with_retry(endpoint, "application/json")?;
        Ok(response.json()?)
    }

    pub fn get_plain_text(&self, endpoint: &str) -> RankerResult<String> {
        let response = self.send_with_retry(endpoint, "text/plain")?;
        Ok(response.text()?)
    }

    fn send_with_retry(&self, endpoint: &str, accept: &'static str) -> RankerResult<Response> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut attempts = 0;

        loop {
            debug!("GET {}", url);
            let response = self.client.get(&url).header(ACCEPT, accept).send()?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }
            if status != StatusCode::TOO_MANY_REQUESTS {
                let error_text = response.text()?;
                return Err(RankerError::Ensembl(format!(
                    "{url} returned {status}: {error_text}"
                )));
            }

            attempts += 1;
            if attempts >= MAX_ATTEMPTS {
                return Err(RankerError::Ensembl(format!(
                    "exceeded {MAX_ATTEMPTS} attempts for {url}"
                )));
            }
            let wait_time = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(1);
            warn!("Rate limited. Waiting {} seconds before retrying...", wait_time);
            thread::sleep(Duration::from_secs(wait_time));
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeneLookup {
    #[serde(rename = "Transcript", default)]
    transcripts: Vec<TranscriptLookup>,
}

#[derive(Debug, Deserialize)]
struct TranscriptLookup {
    id: String,
    start: i64,
    end: i64,
    #[serde(default)]
    is_canonical: Option<u8>,
    #[serde(rename = "Exon", default)]
    exons: Vec<ExonLookup>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExonLookup {
    id: String,
    start: i64,
    end: i64,
}

/// Exon layout of a gene's canonical transcript, exons in genomic order.
#[derive(Debug, Clone)]
struct CanonicalTranscript {
    id: String,
    start: i64,
    end: i64,
    exons: Vec<ExonLookup>,
}

impl CanonicalTranscript {
    fn from_lookup(gene_id: &str, lookup: GeneLookup) -> RankerResult<Self> {
        let mut transcripts = lookup.transcripts;
        let pick = transcripts
            .iter()
            .position(|t| t.is_canonical == Some(1))
            .unwrap_or(0);
        if transcripts.is_empty() {
            return Err(RankerError::UnknownGene(gene_id.to_string()));
        }
        let transcript = transcripts.swap_remove(pick);
        let mut exons = transcript.exons;
        exons.sort_by_key(|e| e.start);
        Ok(Self {
            id: transcript.id,
            start: transcript.start,
            end: transcript.end,
            exons,
        })
    }

    /// Ensembl coordinates are 1-based inclusive; starts are shifted to 0-based.
    fn gene_info(&self) -> GeneInfo {
        GeneInfo {
            tx_start: self.start - 1,
            tx_end: self.end,
            exon_count: self.exons.len(),
            exon_starts: self.exons.iter().map(|e| e.start - 1).collect(),
            exon_ends: self.exons.iter().map(|e| e.end).collect(),
        }
    }
}

/// Ensembl REST ids carry no version suffix.
fn unversioned(gene_id: &str) -> &str {
    gene_id.split('.').next().unwrap_or(gene_id)
}

/// Sequence provider backed by the Ensembl REST API.
///
/// Exon `n` of a gene is the `n`-th exon (genomic order) of its canonical
/// transcript. Lookups are cached per gene for the lifetime of the provider.
pub struct EnsemblSequenceProvider {
    api: ApiHandler,
    transcripts: RefCell<HashMap<String, CanonicalTranscript>>,
}

impl EnsemblSequenceProvider {
    pub fn new(base_url: &str) -> RankerResult<Self> {
        Ok(Self {
            api: ApiHandler::new(base_url)?,
            transcripts: RefCell::new(HashMap::new()),
        })
    }

    fn canonical_transcript(&self, gene_id: &str) -> RankerResult<CanonicalTranscript> {
        let stable_id = unversioned(gene_id);
        if let Some(cached) = self.transcripts.borrow().get(stable_id) {
            return Ok(cached.clone());
        }

        info!("Fetching transcripts for gene ID: {}", stable_id);
        let lookup: GeneLookup = self.api.get_json(&format!("/lookup/id/{stable_id}?expand=1"))?;
        let transcript = CanonicalTranscript::from_lookup(stable_id, lookup)?;
        debug!(
            "Canonical transcript {} with {} exons",
            transcript.id,
            transcript.exons.len()
        );
        self.transcripts
            .borrow_mut()
            .insert(stable_id.to_string(), transcript.clone());
        Ok(transcript)
    }
}

impl SequenceProvider for EnsemblSequenceProvider {
    fn sequence_for_exon(&self, exon_key: &str) -> RankerResult<String> {
        let key = ExonKey::parse(exon_key)?;
        let transcript = self.canonical_transcript(&key.gene_id)?;
        let exon = transcript
            .exons
            .get(key.exon_number)
            .ok_or_else(|| RankerError::MissingSequence(exon_key.to_string()))?;

        let sequence = self
            .api
            .get_plain_text(&format!("/sequence/id/{}?type=genomic", exon.id))?;
        Ok(sequence.trim().to_string())
    }

    fn gene_info(&self, gene_id: &str) -> RankerResult<GeneInfo> {
        Ok(self.canonical_transcript(gene_id)?.gene_info())
    }
}
