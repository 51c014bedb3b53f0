//! Typed wrapper over the beacon REST endpoints this crate consumes:
//! one method per endpoint, each returning `Result<_, Error>`, with
//! duty/committee responses memoized per-epoch.

use crate::beacon::cache::EpochCache;
use crate::beacon::retry::{backoff_delay, MAX_ATTEMPTS};
use crate::beacon::wire;
use crate::bitfield;
use crate::error::Error;
use crate::metrics;
use crate::types::{Block, CommitteeIndex, DutyCommittees, Epoch, ProposerDuty, Pubkey, Slot, ValidatorIndex};
use reqwest::{Client, StatusCode};
use slog::{debug, warn, Logger};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use url::Url;

/// Outcome of a retrying GET/POST: either a successful response, or a
/// retry budget exhausted entirely on 404s.
enum Fetch {
    Response(reqwest::Response),
    NotFoundExhausted,
}

pub struct BeaconNodeClient {
    http: Client,
    base_url: Url,
    log: Logger,
    proposer_duties_cache: Mutex<EpochCache<Vec<ProposerDuty>>>,
    committees_cache: Mutex<EpochCache<DutyCommittees>>,
}

impl BeaconNodeClient {
    pub fn new(base_url: Url, log: Logger) -> Self {
        BeaconNodeClient {
            http: Client::new(),
            base_url,
            log,
            // 2 proposer-duty epochs and 1 committees epoch is enough
            // to cover the current and next epoch's lookups.
            proposer_duties_cache: Mutex::new(EpochCache::new(2)),
            committees_cache: Mutex::new(EpochCache::new(1)),
        }
    }

    fn url(&self, path: &str) -> Url {
        self.base_url.join(path).expect("path must be a valid relative URL")
    }

    async fn fetch_with_retry<F>(&self, build: F) -> Result<Fetch, Error>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        for attempt in 1..=MAX_ATTEMPTS {
            let response = build()
                .send()
                .await
                .map_err(|e| Error::TransportError(e.to_string()))?;

            if response.status().is_success() {
                return Ok(Fetch::Response(response));
            }

            if response.status() == StatusCode::NOT_FOUND {
                if attempt < MAX_ATTEMPTS {
                    debug!(self.log, "retrying after 404"; "attempt" => attempt);
                    tokio::time::sleep(backoff_delay(attempt)).await;
                    continue;
                }
                return Ok(Fetch::NotFoundExhausted);
            }

            return Err(Error::TransportError(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        Ok(Fetch::NotFoundExhausted)
    }

    /// `get_block(slot) -> Block | NoBlock`.
    pub async fn get_block(&self, slot: Slot) -> Result<Option<Block>, Error> {
        let url = self.url(&format!("eth/v2/beacon/blocks/{}", slot.as_u64()));
        match self.fetch_with_retry(|| self.http.get(url.clone())).await? {
            Fetch::NotFoundExhausted => Ok(None),
            Fetch::Response(resp) => {
                let body: wire::BlockResponse = resp
                    .json()
                    .await
                    .map_err(|e| Error::TransportError(e.to_string()))?;
                Ok(Some(Block::from(body)))
            }
        }
    }

    /// `get_proposer_duties(epoch) -> [ProposerDuty]`, memoized.
    pub async fn get_proposer_duties(&self, epoch: Epoch) -> Result<Vec<ProposerDuty>, Error> {
        {
            let cache = self.proposer_duties_cache.lock().await;
            if let Some(duties) = cache.get(epoch) {
                return Ok(duties.clone());
            }
        }

        let url = self.url(&format!("eth/v1/validator/duties/proposer/{}", epoch.as_u64()));
        let duties = match self.fetch_with_retry(|| self.http.get(url.clone())).await? {
            Fetch::NotFoundExhausted => {
                return Err(Error::TransportError("proposer duties not found".into()))
            }
            Fetch::Response(resp) => {
                let body: wire::ProposerDutiesResponse = resp
                    .json()
                    .await
                    .map_err(|e| Error::TransportError(e.to_string()))?;
                body.data
            }
        };

        let mut cache = self.proposer_duties_cache.lock().await;
        cache.insert(epoch, duties.clone());
        Ok(duties)
    }

    /// `get_active_index_to_pubkey(watched) -> Map<Index, Pubkey>`.
    /// Also publishes `total_active_validators_count` / `our_active_validators_count`.
    pub async fn get_active_index_to_pubkey(
        &self,
        watched: &HashSet<Pubkey>,
    ) -> Result<HashMap<ValidatorIndex, Pubkey>, Error> {
        let mut url = self.url("eth/v1/beacon/states/head/validators");
        url.query_pairs_mut().append_pair("status", "active");

        let body: wire::ValidatorsResponse = match self.fetch_with_retry(|| self.http.get(url.clone())).await? {
            Fetch::NotFoundExhausted => return Err(Error::TransportError("validators not found".into())),
            Fetch::Response(resp) => resp.json().await.map_err(|e| Error::TransportError(e.to_string()))?,
        };

        metrics::TOTAL_ACTIVE_VALIDATORS_COUNT.set(body.data.len() as i64);

        let our_active: HashMap<ValidatorIndex, Pubkey> = body
            .data
            .into_iter()
            .filter(|record| record.status.is_active())
            .filter(|record| watched.contains(&record.validator.pubkey))
            .map(|record| (record.index, record.validator.pubkey))
            .collect();

        metrics::OUR_ACTIVE_VALIDATORS_COUNT.set(our_active.len() as i64);
        Ok(our_active)
    }

    /// `get_duty_committees(epoch) -> Map<Slot, Map<CommitteeIndex, [Index]>>`, memoized.
    pub async fn get_duty_committees(&self, epoch: Epoch) -> Result<DutyCommittees, Error> {
        {
            let cache = self.committees_cache.lock().await;
            if let Some(committees) = cache.get(epoch) {
                return Ok(committees.clone());
            }
        }

        let mut url = self.url("eth/v1/beacon/states/head/committees");
        url.query_pairs_mut().append_pair("epoch", &epoch.as_u64().to_string());

        let body: wire::CommitteesResponse = match self.fetch_with_retry(|| self.http.get(url.clone())).await? {
            Fetch::NotFoundExhausted => return Err(Error::TransportError("committees not found".into())),
            Fetch::Response(resp) => resp.json().await.map_err(|e| Error::TransportError(e.to_string()))?,
        };

        let mut result: DutyCommittees = HashMap::new();
        for item in body.data {
            result.entry(item.slot).or_default().insert(item.committee_index, item.validators);
        }

        let mut cache = self.committees_cache.lock().await;
        cache.insert(epoch, result.clone());
        Ok(result)
    }

    /// `get_validators_liveness(epoch, indices) -> Map<Index, bool>`. A
    /// transport failure here should be treated by the caller as a
    /// graceful degradation, not a fatal error.
    pub async fn get_validators_liveness(
        &self,
        epoch: Epoch,
        indices: &HashSet<ValidatorIndex>,
    ) -> Result<HashMap<ValidatorIndex, bool>, Error> {
        let url = self.url("lighthouse/liveness");
        let request_body = wire::LivenessRequest {
            epoch: epoch.as_u64(),
            indices: indices.iter().copied().collect(),
        };

        let body: wire::LivenessResponse = match self
            .fetch_with_retry(|| self.http.post(url.clone()).json(&request_body))
            .await?
        {
            Fetch::NotFoundExhausted => {
                warn!(self.log, "liveness endpoint unavailable"; "epoch" => epoch.as_u64());
                return Err(Error::TransportError("liveness endpoint not found".into()));
            }
            Fetch::Response(resp) => resp.json().await.map_err(|e| Error::TransportError(e.to_string()))?,
        };

        Ok(body.data.into_iter().map(|item| (item.index, item.is_live)).collect())
    }

    /// `aggregate_attestations(block, target_slot) -> Map<CommitteeIndex, [bool]>`.
    pub fn aggregate_attestations(
        &self,
        block: &Block,
        target_slot: Slot,
    ) -> Result<HashMap<CommitteeIndex, Vec<bool>>, Error> {
        let mut by_committee: HashMap<CommitteeIndex, Vec<Vec<bool>>> = HashMap::new();

        for attestation in block.attestations.iter().filter(|a| a.data_slot == target_slot) {
            let decoded = bitfield::decode_aggregation_bits(&attestation.aggregation_bits)?;
            let stripped = bitfield::strip_sentinel(&decoded)?;
            by_committee.entry(attestation.committee_index).or_default().push(stripped);
        }

        by_committee
            .into_iter()
            .map(|(committee_index, sequences)| Ok((committee_index, bitfield::or_fold(&sequences)?)))
            .collect()
    }
}
