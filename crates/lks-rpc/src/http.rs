//! reqwest-backed [`LockApi`].

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use lks_schemas::{
    DiceRollResult, EditExtensionsRequest, GuessTimerResult, HistoryPage, HistoryPageRequest,
    KeyholderLocksPage, KeyholderSearchRequest, Lock, LockListFilter, PilloryVoteInfo,
    ShareLinkResult, SpinWheelResult, TaskAction, TemporaryCombination, VerificationPictureEntry,
};

use crate::error::ApiError;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::{ApiResult, Credential, LockApi};

const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

#[derive(Debug, Clone)]
pub struct HttpLockApi {
    http: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
}

impl HttpLockApi {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.chaster.app";

    pub fn new(policy: RetryPolicy) -> Result<Self> {
        Self::new_with_base_url(Self::DEFAULT_BASE_URL.to_string(), policy)
    }

    pub fn new_with_base_url(base_url: String, policy: RetryPolicy) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(policy.timeout)
            .build()
            .context("http client build failed")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send with the retry policy. `build` is invoked once per attempt since
    /// request bodies (multipart in particular) cannot be replayed.
    async fn send<F>(&self, cred: &Credential, path: &str, build: F) -> Result<Response>
    where
        F: Fn(&reqwest::Client, String) -> Result<RequestBuilder> + Send + Sync,
    {
        let mut attempt: u32 = 0;
        loop {
            let req = build(&self.http, self.url(path))?.bearer_auth(cred.secret());

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let reset = resp
                        .headers()
                        .get(RATE_LIMIT_RESET_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);

                    match self.policy.decide(status, attempt, reset.as_deref(), Utc::now()) {
                        RetryDecision::Return => {
                            debug!(path, status, attempt, "rpc/response");
                            return Ok(resp);
                        }
                        RetryDecision::RetryAfter(wait) => {
                            warn!(
                                path,
                                status,
                                attempt,
                                wait_ms = wait.as_millis() as u64,
                                "rpc/retry"
                            );
                            tokio::time::sleep(wait).await;
                        }
                    }
                }
                Err(e) if attempt < self.policy.max_retries && (e.is_timeout() || e.is_connect()) => {
                    let wait = self.policy.backoff(attempt);
                    warn!(path, attempt, error = %e, wait_ms = wait.as_millis() as u64, "rpc/retry");
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    return Err(ApiError::Transport {
                        path: path.to_string(),
                        message: e.to_string(),
                    }
                    .into());
                }
            }
            attempt += 1;
        }
    }

    async fn decode<T: DeserializeOwned>(path: &str, resp: Response) -> Result<ApiResult<T>> {
        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            return Ok(ApiResult::status_only(status));
        }
        let value = resp.json::<T>().await.map_err(|e| ApiError::Decode {
            path: path.to_string(),
            status,
            message: e.to_string(),
        })?;
        Ok(ApiResult {
            status,
            value: Some(value),
        })
    }

    async fn post_status<B: Serialize + Sync>(
        &self,
        cred: &Credential,
        path: &str,
        body: &B,
    ) -> Result<ApiResult<()>> {
        let resp = self
            .send(cred, path, |http, url| Ok(http.post(url).json(body)))
            .await?;
        Ok(ApiResult::status_only(resp.status().as_u16()))
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        cred: &Credential,
        path: &str,
        body: &B,
    ) -> Result<ApiResult<T>> {
        let resp = self
            .send(cred, path, |http, url| Ok(http.post(url).json(body)))
            .await?;
        Self::decode(path, resp).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        cred: &Credential,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<ApiResult<T>> {
        let resp = self
            .send(cred, path, |http, url| Ok(http.get(url).query(query)))
            .await?;
        Self::decode(path, resp).await
    }

    fn action_path(lock_id: &str, extension_id: &str) -> String {
        format!("/locks/{lock_id}/extensions/{extension_id}/action")
    }

    async fn action(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
        action: &str,
        payload: Value,
    ) -> Result<ApiResult<()>> {
        let body = json!({ "action": action, "payload": payload });
        self.post_status(cred, &Self::action_path(lock_id, extension_id), &body)
            .await
    }

    async fn action_json<T: DeserializeOwned>(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
        action: &str,
        payload: Value,
    ) -> Result<ApiResult<T>> {
        let body = json!({ "action": action, "payload": payload });
        self.post_json(cred, &Self::action_path(lock_id, extension_id), &body)
            .await
    }
}

#[async_trait::async_trait]
impl LockApi for HttpLockApi {
    async fn locks(
        &self,
        cred: &Credential,
        filter: LockListFilter,
    ) -> Result<ApiResult<Vec<Lock>>> {
        self.get_json(cred, "/locks", &[("status", filter.as_str())])
            .await
    }

    async fn search_keyholder_locks(
        &self,
        cred: &Credential,
        req: &KeyholderSearchRequest,
    ) -> Result<ApiResult<KeyholderLocksPage>> {
        self.post_json(cred, "/keyholder/locks/search", req).await
    }

    async fn lock_history(
        &self,
        cred: &Credential,
        lock_id: &str,
        req: &HistoryPageRequest,
    ) -> Result<ApiResult<HistoryPage>> {
        self.post_json(cred, &format!("/locks/{lock_id}/history"), req)
            .await
    }

    async fn archive_lock(&self, cred: &Credential, lock_id: &str) -> Result<ApiResult<()>> {
        self.post_status(cred, &format!("/locks/{lock_id}/archive"), &json!({}))
            .await
    }

    async fn archive_keyholder_lock(
        &self,
        cred: &Credential,
        lock_id: &str,
    ) -> Result<ApiResult<()>> {
        self.post_status(
            cred,
            &format!("/locks/{lock_id}/archive/keyholder"),
            &json!({}),
        )
        .await
    }

    async fn unlock_lock(&self, cred: &Credential, lock_id: &str) -> Result<ApiResult<()>> {
        self.post_status(cred, &format!("/locks/{lock_id}/unlock"), &json!({}))
            .await
    }

    async fn set_freeze(
        &self,
        cred: &Credential,
        lock_id: &str,
        is_frozen: bool,
    ) -> Result<ApiResult<()>> {
        self.post_status(
            cred,
            &format!("/locks/{lock_id}/freeze"),
            &json!({ "isFrozen": is_frozen }),
        )
        .await
    }

    async fn trust_keyholder(&self, cred: &Credential, lock_id: &str) -> Result<ApiResult<()>> {
        self.post_status(
            cred,
            &format!("/locks/{lock_id}/trust-keyholder"),
            &json!({}),
        )
        .await
    }

    async fn set_max_limit_date(
        &self,
        cred: &Credential,
        lock_id: &str,
        max_limit_date: Option<DateTime<Utc>>,
        disable: bool,
    ) -> Result<ApiResult<()>> {
        self.post_status(
            cred,
            &format!("/locks/{lock_id}/max-limit-date"),
            &json!({ "maxLimitDate": max_limit_date, "disableMaxLimitDate": disable }),
        )
        .await
    }

    async fn update_time(
        &self,
        cred: &Credential,
        lock_id: &str,
        duration_secs: i64,
    ) -> Result<ApiResult<()>> {
        self.post_status(
            cred,
            &format!("/locks/{lock_id}/update-time"),
            &json!({ "duration": duration_secs }),
        )
        .await
    }

    async fn update_settings(
        &self,
        cred: &Credential,
        lock_id: &str,
        display_remaining_time: bool,
        hide_time_logs: bool,
    ) -> Result<ApiResult<()>> {
        self.post_status(
            cred,
            &format!("/locks/{lock_id}/settings"),
            &json!({
                "displayRemainingTime": display_remaining_time,
                "hideTimeLogs": hide_time_logs,
            }),
        )
        .await
    }

    async fn update_extensions(
        &self,
        cred: &Credential,
        lock_id: &str,
        req: &EditExtensionsRequest,
    ) -> Result<ApiResult<()>> {
        self.post_status(cred, &format!("/locks/{lock_id}/extensions"), req)
            .await
    }

    async fn update_tasks(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
        tasks: &[TaskAction],
    ) -> Result<ApiResult<()>> {
        self.action(
            cred,
            lock_id,
            extension_id,
            "updateTasks",
            json!({ "tasks": tasks }),
        )
        .await
    }

    async fn resolve_task(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
        is_completed: bool,
    ) -> Result<ApiResult<()>> {
        self.action(
            cred,
            lock_id,
            extension_id,
            "completeTask",
            json!({ "isCompleted": is_completed }),
        )
        .await
    }

    async fn assign_random_task(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<()>> {
        self.action(cred, lock_id, extension_id, "assignRandomTask", json!({}))
            .await
    }

    async fn assign_vote_task(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
        duration_secs: i64,
    ) -> Result<ApiResult<()>> {
        self.action(
            cred,
            lock_id,
            extension_id,
            "createVoteTask",
            json!({ "duration": duration_secs }),
        )
        .await
    }

    async fn assign_task(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
        task: &TaskAction,
    ) -> Result<ApiResult<()>> {
        self.action(
            cred,
            lock_id,
            extension_id,
            "assignTask",
            json!({ "task": task }),
        )
        .await
    }

    async fn pillory(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
        reason: &str,
        duration_secs: i64,
    ) -> Result<ApiResult<()>> {
        self.action(
            cred,
            lock_id,
            extension_id,
            "submit",
            json!({ "reason": reason, "duration": duration_secs }),
        )
        .await
    }

    async fn set_temporary_combination(
        &self,
        cred: &Credential,
        lock_id: &str,
        combination_id: &str,
    ) -> Result<ApiResult<()>> {
        self.post_status(
            cred,
            &format!("/extensions/temporary-opening/{lock_id}/combination"),
            &json!({ "combinationId": combination_id }),
        )
        .await
    }

    async fn keyholder_temporary_unlock(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<()>> {
        self.action(cred, lock_id, extension_id, "keyholderOpen", json!({}))
            .await
    }

    async fn wearer_temporary_unlock(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<()>> {
        self.action(cred, lock_id, extension_id, "submit", json!({}))
            .await
    }

    async fn create_verification_request(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<()>> {
        self.action(
            cred,
            lock_id,
            extension_id,
            "createVerificationRequest",
            json!({}),
        )
        .await
    }

    async fn upload_verification_picture(
        &self,
        cred: &Credential,
        lock_id: &str,
        data: &[u8],
        content_type: Option<&str>,
    ) -> Result<ApiResult<()>> {
        let path = "/extensions/verification-picture/submit";
        let resp = self
            .send(cred, path, |http, url| {
                let mut part =
                    reqwest::multipart::Part::bytes(data.to_vec()).file_name("verification");
                if let Some(ct) = content_type {
                    part = part
                        .mime_str(ct)
                        .map_err(|e| ApiError::Request(e.to_string()))?;
                }
                let form = reqwest::multipart::Form::new()
                    .text("lockId", lock_id.to_string())
                    .part("file", part);
                Ok(http.post(url).multipart(form))
            })
            .await?;
        Ok(ApiResult::status_only(resp.status().as_u16()))
    }

    async fn roll_dice(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<DiceRollResult>> {
        self.action_json(cred, lock_id, extension_id, "submit", json!({}))
            .await
    }

    async fn submit_timer_guess(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<GuessTimerResult>> {
        self.action_json(cred, lock_id, extension_id, "submit", json!({}))
            .await
    }

    async fn spin_wheel(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<SpinWheelResult>> {
        self.action_json(cred, lock_id, extension_id, "submit", json!({}))
            .await
    }

    async fn share_link(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<ShareLinkResult>> {
        self.action_json(cred, lock_id, extension_id, "getLink", json!({}))
            .await
    }

    async fn pillory_vote_info(
        &self,
        cred: &Credential,
        lock_id: &str,
        extension_id: &str,
    ) -> Result<ApiResult<Vec<PilloryVoteInfo>>> {
        self.action_json(cred, lock_id, extension_id, "getStatus", json!({}))
            .await
    }

    async fn temporary_combination(
        &self,
        cred: &Credential,
        lock_id: &str,
    ) -> Result<ApiResult<TemporaryCombination>> {
        self.get_json(
            cred,
            &format!("/extensions/temporary-opening/{lock_id}/combination"),
            &[],
        )
        .await
    }

    async fn verification_pictures(
        &self,
        cred: &Credential,
        lock_id: &str,
    ) -> Result<ApiResult<Vec<VerificationPictureEntry>>> {
        self.get_json(
            cred,
            &format!("/locks/{lock_id}/verification-pictures"),
            &[],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = HttpLockApi::new_with_base_url(
            "http://localhost:9999/".to_string(),
            RetryPolicy::default(),
        )
        .unwrap();
        assert_eq!(api.url("/locks"), "http://localhost:9999/locks");
    }
}
