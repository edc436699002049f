//! Access token operations of the linking service
//!
//! Redemption cannot look a token up by its code: only a salted hash is
//! stored. Every active token is a candidate and is tested with
//! [`SecretHasher::verify`](crate::core::hasher::SecretHasher::verify)
//! until one matches. The scan runs on the blocking pool since each
//! verification is a full Argon2 evaluation.

use super::LinkingService;
use super::commands::{IssueToken, RedeemToken};
use crate::core::actor::{ActorKind, CompanyId};
use crate::core::error::{LinkingError, Result};
use crate::core::events::LinkingEvent;
use crate::core::link::Link;
use crate::core::token::{AccessToken, IssuedToken, Redemption, generate_code, normalize_code};
use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

impl LinkingService {
    /// Issue a new access code for a company
    ///
    /// The plaintext code is returned here and nowhere else.
    #[instrument(skip(self, cmd), fields(company_id = %cmd.company_id), err)]
    pub async fn issue_token(&self, cmd: IssueToken, now: DateTime<Utc>) -> Result<IssuedToken> {
        cmd.validate()?;
        let policy = &self.config.tokens;
        let ttl_minutes = cmd.ttl_minutes.unwrap_or(policy.default_ttl_minutes);
        if ttl_minutes > policy.max_ttl_minutes {
            return Err(LinkingError::Validation(format!(
                "ttl_minutes: {} exceeds the maximum of {}",
                ttl_minutes, policy.max_ttl_minutes
            )));
        }
        let single_use = cmd.single_use.unwrap_or(policy.default_single_use);

        self.ensure_actor(ActorKind::Company, cmd.company_id.0)
            .await?;

        let code = generate_code(self.random.as_ref(), policy.code_bytes);
        let hasher = Arc::clone(&self.hasher);
        let secret = code.clone();
        let secret_hash = tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| LinkingError::Storage(anyhow!("Hashing task failed: {}", e)))??;

        let token = AccessToken::new(
            cmd.company_id,
            secret_hash,
            now,
            Duration::minutes(i64::from(ttl_minutes)),
            single_use,
        );
        let token = self.store.insert_token(token).await?;
        let company_name = self
            .actors
            .display_name(ActorKind::Company, cmd.company_id.0)
            .await?;

        info!(token_id = %token.id, expires_at = %token.expires_at, single_use, "token issued");
        self.publish(
            LinkingEvent::TokenIssued {
                token_id: token.id,
                company_id: token.company_id,
                expires_at: token.expires_at,
            },
            now,
        );

        Ok(IssuedToken {
            token_id: token.id,
            code,
            company_id: token.company_id,
            company_name,
            expires_at: token.expires_at,
            single_use: token.single_use,
        })
    }

    /// List token metadata, most recently created first
    pub async fn list_tokens(&self, company_id: Option<CompanyId>) -> Result<Vec<AccessToken>> {
        self.store.list_tokens(company_id).await
    }

    pub async fn get_token(&self, id: &Uuid) -> Result<AccessToken> {
        self.store
            .get_token(id)
            .await?
            .ok_or_else(|| LinkingError::token_not_found(*id))
    }

    /// Deactivate a token regardless of expiry or usage
    #[instrument(skip(self), err)]
    pub async fn revoke_token(&self, id: &Uuid, now: DateTime<Utc>) -> Result<AccessToken> {
        let token = self.store.revoke_token(id).await?;

        info!(company_id = %token.company_id, "token revoked");
        self.publish(
            LinkingEvent::TokenRevoked {
                token_id: token.id,
                company_id: token.company_id,
            },
            now,
        );
        Ok(token)
    }

    /// Redeem an access code and link the student to the issuing company
    ///
    /// Errors:
    /// - `Invalid`: malformed code, or no active token matches
    /// - `NotFound`: the student (or the token's company) is unknown
    /// - `Expired`: the matching token is past `expires_at`
    /// - `AlreadyUsed`: the matching single-use token was redeemed before
    /// - `Conflict`: the pair already has an active link
    #[instrument(skip(self, cmd), fields(student_id = %cmd.student_id), err)]
    pub async fn redeem_token(&self, cmd: RedeemToken, now: DateTime<Utc>) -> Result<Link> {
        if cmd.validate().is_err() {
            return Err(LinkingError::Invalid);
        }
        let code = normalize_code(&cmd.code).ok_or(LinkingError::Invalid)?;
        self.ensure_actor(ActorKind::Student, cmd.student_id.0)
            .await?;

        let candidates = self.store.active_tokens().await?;
        let scanned = candidates.len();
        let matched = self.find_matching_token(code, candidates).await?;
        debug!(candidates = scanned, matched = matched.is_some(), "token scan finished");

        let token = matched.ok_or(LinkingError::Invalid)?;
        token.check_redeemable(now)?;
        self.ensure_actor(ActorKind::Company, token.company_id.0)
            .await?;

        // The store re-validates the token and the pair atomically
        let Redemption { token, link } = self
            .store
            .redeem_token(&token.id, cmd.student_id, now)
            .await?;

        info!(token_id = %token.id, link_id = %link.id, company_id = %link.company_id, "token redeemed");
        self.publish(
            LinkingEvent::TokenRedeemed {
                token_id: token.id,
                link_id: link.id,
                student_id: link.student_id,
                company_id: link.company_id,
            },
            now,
        );
        self.publish(
            LinkingEvent::LinkCreated {
                link_id: link.id,
                student_id: link.student_id,
                company_id: link.company_id,
                origin: link.origin,
            },
            now,
        );
        Ok(link)
    }

    async fn find_matching_token(
        &self,
        code: String,
        candidates: Vec<AccessToken>,
    ) -> Result<Option<AccessToken>> {
        let hasher = Arc::clone(&self.hasher);

        tokio::task::spawn_blocking(move || {
            candidates.into_iter().find(|token| {
                match hasher.verify(&code, &token.secret_hash) {
                    Ok(matched) => matched,
                    Err(e) => {
                        warn!(token_id = %token.id, error = %e, "skipping token with unreadable hash");
                        false
                    }
                }
            })
        })
        .await
        .map_err(|e| LinkingError::Storage(anyhow!("Token scan task failed: {}", e)))
    }
}
