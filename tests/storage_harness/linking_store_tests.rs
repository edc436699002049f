//! Macro-generated test suite for `LinkingStore` contract validation.
//!
//! The `linking_store_tests!` macro generates a test module that validates
//! any `LinkingStore` implementation against the full contract: link
//! uniqueness, token lifecycle, the request state machine, the two atomic
//! units, and concurrent access.
//!
//! # Generated Tests
//!
//! ## Links
//! - `test_insert_and_get_link`: insert then retrieve, verify all fields
//! - `test_get_link_nonexistent`: random UUID returns None
//! - `test_insert_link_conflict`: second active link for a pair fails
//! - `test_list_links_filters_and_order`: filters combine, newest first
//! - `test_deactivate_and_reactivate`: flags and timestamps
//! - `test_relink_after_deactivate`: a new link is allowed, the old one cannot come back
//! - `test_unknown_link_mutations`: NotFound
//!
//! ## Tokens
//! - `test_list_tokens_newest_first`: company filter and ordering
//! - `test_active_tokens_excludes_revoked`
//! - `test_revoke_nonexistent`
//!
//! ## Requests
//! - `test_insert_request_conflicts`: pending duplicate, active link
//! - `test_reject_request`: terminal, blank reason stored as None
//! - `test_list_requests_filters_and_order`
//!
//! ## Atomic units
//! - `test_redeem_token`: marks used and creates a token link
//! - `test_redeem_single_use_twice`: AlreadyUsed
//! - `test_redeem_expired` / `test_redeem_revoked`
//! - `test_redeem_conflict_leaves_token_unused`
//! - `test_approve_request` / `test_approve_twice`
//! - `test_approve_conflict_leaves_request_pending`
//!
//! ## Concurrency
//! - `test_concurrent_insert_link_single_winner`
//! - `test_concurrent_redeem_single_winner`
//! - `test_concurrent_insert_request_single_winner`

/// Generate a full `LinkingStore` conformance test suite.
///
/// `$factory` must evaluate to a fresh, empty store implementing
/// `LinkingStore + Clone + 'static`. It is re-evaluated for each test.
macro_rules! linking_store_tests {
    ($factory:expr) => {
        mod linking_store_contract_tests {
            use super::*;
            use company_links::core::{
                CompanyId, ConflictReason, LinkFilter, LinkOrigin, LinkStore, LinkingError,
                LinkingStore, RequestFilter, RequestStatus, RequestStore, StudentId, TokenStore,
            };
            use futures_util::future::join_all;
            use uuid::Uuid;

            // ==================================================================
            // Links
            // ==================================================================

            #[tokio::test]
            async fn test_insert_and_get_link() {
                let store = $factory;
                let link = manual_link(3, 7, at(0));

                let created = store.insert_link(link.clone()).await.unwrap();
                assert_eq!(created, link);

                let fetched = store.get_link(&link.id).await.unwrap().unwrap();
                assert_eq!(fetched.student_id, StudentId(3));
                assert_eq!(fetched.company_id, CompanyId(7));
                assert!(fetched.active);
                assert_eq!(fetched.linked_at, at(0));
                assert!(fetched.unlinked_at.is_none());
                assert_eq!(fetched.origin, LinkOrigin::Manual);
                assert_eq!(fetched.linked_by, "admin");
            }

            #[tokio::test]
            async fn test_get_link_nonexistent() {
                let store = $factory;
                assert!(store.get_link(&Uuid::new_v4()).await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_insert_link_conflict() {
                let store = $factory;
                store.insert_link(manual_link(3, 7, at(0))).await.unwrap();

                let err = store
                    .insert_link(manual_link(3, 7, at(1)))
                    .await
                    .unwrap_err();
                match err {
                    LinkingError::Conflict {
                        student_id,
                        company_id,
                        reason,
                    } => {
                        assert_eq!(student_id, StudentId(3));
                        assert_eq!(company_id, CompanyId(7));
                        assert_eq!(reason, ConflictReason::ActiveLinkExists);
                    }
                    other => panic!("expected Conflict, got {:?}", other),
                }

                // Other pairs are unaffected
                store.insert_link(manual_link(3, 8, at(2))).await.unwrap();
                store.insert_link(manual_link(4, 7, at(3))).await.unwrap();
            }

            #[tokio::test]
            async fn test_list_links_filters_and_order() {
                let store = $factory;
                let a = store.insert_link(manual_link(3, 7, at(0))).await.unwrap();
                let b = store.insert_link(manual_link(3, 8, at(10))).await.unwrap();
                let c = store.insert_link(manual_link(4, 7, at(20))).await.unwrap();
                store.deactivate_link(&b.id, at(30)).await.unwrap();

                let all = store.list_links(&LinkFilter::new()).await.unwrap();
                let ids: Vec<Uuid> = all.iter().map(|l| l.id).collect();
                assert_eq!(ids, vec![c.id, b.id, a.id]);

                let student = store
                    .list_links(&LinkFilter::new().student(StudentId(3)))
                    .await
                    .unwrap();
                assert_eq!(student.len(), 2);

                let active_for_student = store
                    .list_links(&LinkFilter::new().student(StudentId(3)).active(true))
                    .await
                    .unwrap();
                assert_eq!(active_for_student.len(), 1);
                assert_eq!(active_for_student[0].id, a.id);

                let company = store
                    .list_links(&LinkFilter::new().company(CompanyId(7)))
                    .await
                    .unwrap();
                assert_eq!(company.len(), 2);
                assert_eq!(company[0].id, c.id);
            }

            #[tokio::test]
            async fn test_deactivate_and_reactivate() {
                let store = $factory;
                let link = store.insert_link(manual_link(3, 7, at(0))).await.unwrap();

                let unlinked = store.deactivate_link(&link.id, at(60)).await.unwrap();
                assert!(!unlinked.active);
                assert_eq!(unlinked.unlinked_at, Some(at(60)));
                assert!(
                    store
                        .find_active_link(StudentId(3), CompanyId(7))
                        .await
                        .unwrap()
                        .is_none()
                );

                // Calling twice is accepted
                store.deactivate_link(&link.id, at(60)).await.unwrap();

                let relinked = store.reactivate_link(&link.id).await.unwrap();
                assert!(relinked.active);
                assert!(relinked.unlinked_at.is_none());

                let active = store
                    .find_active_link(StudentId(3), CompanyId(7))
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(active.id, link.id);
            }

            #[tokio::test]
            async fn test_relink_after_deactivate() {
                let store = $factory;
                let first = store.insert_link(manual_link(3, 7, at(0))).await.unwrap();
                store.deactivate_link(&first.id, at(10)).await.unwrap();

                let second = store.insert_link(manual_link(3, 7, at(20))).await.unwrap();

                let err = store.reactivate_link(&first.id).await.unwrap_err();
                assert!(matches!(err, LinkingError::Conflict { .. }));

                // Reactivating the active link itself is a no-op
                store.reactivate_link(&second.id).await.unwrap();

                let history = store
                    .list_links(&LinkFilter::new().student(StudentId(3)).company(CompanyId(7)))
                    .await
                    .unwrap();
                assert_eq!(history.len(), 2);
                assert_eq!(history.iter().filter(|l| l.active).count(), 1);
            }

            #[tokio::test]
            async fn test_unknown_link_mutations() {
                let store = $factory;
                let id = Uuid::new_v4();

                assert!(matches!(
                    store.deactivate_link(&id, at(0)).await,
                    Err(LinkingError::NotFound { .. })
                ));
                assert!(matches!(
                    store.reactivate_link(&id).await,
                    Err(LinkingError::NotFound { .. })
                ));
            }

            // ==================================================================
            // Tokens
            // ==================================================================

            #[tokio::test]
            async fn test_list_tokens_newest_first() {
                let store = $factory;
                let old = store.insert_token(test_token(7, at(0), 30, true)).await.unwrap();
                let new = store.insert_token(test_token(7, at(60), 30, true)).await.unwrap();
                let other = store.insert_token(test_token(8, at(30), 30, true)).await.unwrap();

                let company = store.list_tokens(Some(CompanyId(7))).await.unwrap();
                let ids: Vec<Uuid> = company.iter().map(|t| t.id).collect();
                assert_eq!(ids, vec![new.id, old.id]);

                let all = store.list_tokens(None).await.unwrap();
                let ids: Vec<Uuid> = all.iter().map(|t| t.id).collect();
                assert_eq!(ids, vec![new.id, other.id, old.id]);
            }

            #[tokio::test]
            async fn test_active_tokens_excludes_revoked() {
                let store = $factory;
                let kept = store.insert_token(test_token(7, at(0), 30, true)).await.unwrap();
                let revoked = store.insert_token(test_token(7, at(0), 30, true)).await.unwrap();

                let after = store.revoke_token(&revoked.id).await.unwrap();
                assert!(!after.active);

                let active = store.active_tokens().await.unwrap();
                assert_eq!(active.len(), 1);
                assert_eq!(active[0].id, kept.id);
                assert_eq!(active[0].secret_hash, kept.secret_hash);
            }

            #[tokio::test]
            async fn test_revoke_nonexistent() {
                let store = $factory;
                assert!(matches!(
                    store.revoke_token(&Uuid::new_v4()).await,
                    Err(LinkingError::NotFound { .. })
                ));
            }

            // ==================================================================
            // Requests
            // ==================================================================

            #[tokio::test]
            async fn test_insert_request_conflicts() {
                let store = $factory;
                store.insert_request(pending_request(3, 7, at(0))).await.unwrap();

                let err = store
                    .insert_request(pending_request(3, 7, at(1)))
                    .await
                    .unwrap_err();
                assert!(matches!(
                    err,
                    LinkingError::Conflict {
                        reason: ConflictReason::PendingRequestExists,
                        ..
                    }
                ));

                store.insert_link(manual_link(4, 7, at(2))).await.unwrap();
                let err = store
                    .insert_request(pending_request(4, 7, at(3)))
                    .await
                    .unwrap_err();
                assert!(matches!(
                    err,
                    LinkingError::Conflict {
                        reason: ConflictReason::ActiveLinkExists,
                        ..
                    }
                ));

                let pending = store
                    .list_requests(&RequestFilter::new().status(RequestStatus::Pending))
                    .await
                    .unwrap();
                assert_eq!(pending.len(), 1);
            }

            #[tokio::test]
            async fn test_reject_request() {
                let store = $factory;
                let request = store.insert_request(pending_request(3, 7, at(0))).await.unwrap();

                let rejected = store
                    .reject_request(&request.id, at(60), Some("  ".to_string()))
                    .await
                    .unwrap();
                assert_eq!(rejected.status(), RequestStatus::Rejected);
                assert_eq!(rejected.responded_at(), Some(at(60)));
                assert!(rejected.rejection_reason().is_none());

                let err = store
                    .reject_request(&request.id, at(61), Some("again".to_string()))
                    .await
                    .unwrap_err();
                assert!(matches!(
                    err,
                    LinkingError::InvalidState {
                        status: RequestStatus::Rejected,
                        ..
                    }
                ));
                let err = store.approve_request(&request.id, at(62)).await.unwrap_err();
                assert!(matches!(err, LinkingError::InvalidState { .. }));

                // A new request may follow a rejection
                store.insert_request(pending_request(3, 7, at(70))).await.unwrap();

                assert!(matches!(
                    store.reject_request(&Uuid::new_v4(), at(0), None).await,
                    Err(LinkingError::NotFound { .. })
                ));
            }

            #[tokio::test]
            async fn test_reject_request_keeps_reason() {
                let store = $factory;
                let request = store.insert_request(pending_request(3, 7, at(0))).await.unwrap();

                let rejected = store
                    .reject_request(&request.id, at(5), Some("no openings".to_string()))
                    .await
                    .unwrap();

                let fetched = store.get_request(&rejected.id).await.unwrap().unwrap();
                assert_eq!(fetched.rejection_reason(), Some("no openings"));
            }

            #[tokio::test]
            async fn test_list_requests_filters_and_order() {
                let store = $factory;
                let a = store.insert_request(pending_request(3, 7, at(0))).await.unwrap();
                let b = store.insert_request(pending_request(4, 7, at(10))).await.unwrap();
                let c = store.insert_request(pending_request(3, 8, at(20))).await.unwrap();
                store.reject_request(&a.id, at(30), None).await.unwrap();

                let company = store
                    .list_requests(&RequestFilter::new().company(CompanyId(7)))
                    .await
                    .unwrap();
                let ids: Vec<Uuid> = company.iter().map(|r| r.id).collect();
                assert_eq!(ids, vec![b.id, a.id]);

                let student_pending = store
                    .list_requests(
                        &RequestFilter::new()
                            .student(StudentId(3))
                            .status(RequestStatus::Pending),
                    )
                    .await
                    .unwrap();
                assert_eq!(student_pending.len(), 1);
                assert_eq!(student_pending[0].id, c.id);
            }

            // ==================================================================
            // Atomic units
            // ==================================================================

            #[tokio::test]
            async fn test_redeem_token() {
                let store = $factory;
                let token = store.insert_token(test_token(7, at(0), 30, true)).await.unwrap();

                let redemption = store
                    .redeem_token(&token.id, StudentId(3), at(60))
                    .await
                    .unwrap();
                assert!(redemption.token.used);
                assert_eq!(redemption.token.used_at, Some(at(60)));
                assert_eq!(redemption.token.used_by, Some(StudentId(3)));
                assert_eq!(redemption.link.origin, LinkOrigin::Token);
                assert_eq!(redemption.link.company_id, CompanyId(7));
                assert_eq!(redemption.link.linked_by, token.id.to_string());

                let stored = store.get_token(&token.id).await.unwrap().unwrap();
                assert!(stored.used);
                let link = store
                    .find_active_link(StudentId(3), CompanyId(7))
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(link.id, redemption.link.id);
            }

            #[tokio::test]
            async fn test_redeem_single_use_twice() {
                let store = $factory;
                let token = store.insert_token(test_token(7, at(0), 30, true)).await.unwrap();

                store.redeem_token(&token.id, StudentId(3), at(1)).await.unwrap();
                let err = store
                    .redeem_token(&token.id, StudentId(4), at(2))
                    .await
                    .unwrap_err();
                assert!(matches!(err, LinkingError::AlreadyUsed { .. }));

                let links = store
                    .list_links(&LinkFilter::new().company(CompanyId(7)))
                    .await
                    .unwrap();
                assert_eq!(links.len(), 1);
            }

            #[tokio::test]
            async fn test_redeem_multi_use() {
                let store = $factory;
                let token = store.insert_token(test_token(7, at(0), 30, false)).await.unwrap();

                store.redeem_token(&token.id, StudentId(3), at(1)).await.unwrap();
                let second = store
                    .redeem_token(&token.id, StudentId(4), at(2))
                    .await
                    .unwrap();
                assert_eq!(second.token.used_by, Some(StudentId(4)));
            }

            #[tokio::test]
            async fn test_redeem_expired() {
                let store = $factory;
                let token = store.insert_token(test_token(7, at(0), 30, true)).await.unwrap();

                // Expiry is exclusive: now == expires_at is already expired
                let err = store
                    .redeem_token(&token.id, StudentId(3), at(30 * 60))
                    .await
                    .unwrap_err();
                assert!(matches!(err, LinkingError::Expired { .. }));

                let stored = store.get_token(&token.id).await.unwrap().unwrap();
                assert!(!stored.used);
            }

            #[tokio::test]
            async fn test_redeem_revoked() {
                let store = $factory;
                let token = store.insert_token(test_token(7, at(0), 30, true)).await.unwrap();
                store.revoke_token(&token.id).await.unwrap();

                let err = store
                    .redeem_token(&token.id, StudentId(3), at(1))
                    .await
                    .unwrap_err();
                assert!(matches!(err, LinkingError::Invalid));
            }

            #[tokio::test]
            async fn test_redeem_conflict_leaves_token_unused() {
                let store = $factory;
                let token = store.insert_token(test_token(7, at(0), 30, true)).await.unwrap();
                store.insert_link(manual_link(3, 7, at(0))).await.unwrap();

                let err = store
                    .redeem_token(&token.id, StudentId(3), at(1))
                    .await
                    .unwrap_err();
                assert!(matches!(err, LinkingError::Conflict { .. }));

                let stored = store.get_token(&token.id).await.unwrap().unwrap();
                assert!(!stored.used);
                assert!(stored.used_by.is_none());

                // Still redeemable by someone else
                store.redeem_token(&token.id, StudentId(4), at(2)).await.unwrap();
            }

            #[tokio::test]
            async fn test_approve_request() {
                let store = $factory;
                let request = store.insert_request(pending_request(3, 7, at(0))).await.unwrap();

                let approval = store.approve_request(&request.id, at(60)).await.unwrap();
                assert_eq!(approval.request.status(), RequestStatus::Approved);
                assert_eq!(approval.request.responded_at(), Some(at(60)));
                assert_eq!(approval.link.origin, LinkOrigin::Request);
                assert_eq!(approval.link.linked_by, request.id.to_string());

                let fetched = store.get_request(&request.id).await.unwrap().unwrap();
                assert_eq!(fetched.status(), RequestStatus::Approved);
                assert!(
                    store
                        .find_active_link(StudentId(3), CompanyId(7))
                        .await
                        .unwrap()
                        .is_some()
                );
            }

            #[tokio::test]
            async fn test_approve_twice() {
                let store = $factory;
                let request = store.insert_request(pending_request(3, 7, at(0))).await.unwrap();

                store.approve_request(&request.id, at(1)).await.unwrap();
                let err = store.approve_request(&request.id, at(2)).await.unwrap_err();
                assert!(matches!(
                    err,
                    LinkingError::InvalidState {
                        status: RequestStatus::Approved,
                        ..
                    }
                ));

                let links = store.list_links(&LinkFilter::new()).await.unwrap();
                assert_eq!(links.len(), 1);

                assert!(matches!(
                    store.approve_request(&Uuid::new_v4(), at(3)).await,
                    Err(LinkingError::NotFound { .. })
                ));
            }

            #[tokio::test]
            async fn test_approve_conflict_leaves_request_pending() {
                let store = $factory;
                let request = store.insert_request(pending_request(3, 7, at(0))).await.unwrap();
                store.insert_link(manual_link(3, 7, at(1))).await.unwrap();

                let err = store.approve_request(&request.id, at(2)).await.unwrap_err();
                assert!(matches!(err, LinkingError::Conflict { .. }));

                let fetched = store.get_request(&request.id).await.unwrap().unwrap();
                assert!(fetched.is_pending());
                assert!(fetched.responded_at().is_none());
            }

            // ==================================================================
            // Concurrency
            // ==================================================================

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn test_concurrent_insert_link_single_winner() {
                let store = $factory;

                let handles: Vec<_> = (0..8)
                    .map(|i| {
                        let store = store.clone();
                        tokio::spawn(async move {
                            store.insert_link(manual_link(3, 7, at(i))).await
                        })
                    })
                    .collect();
                let results: Vec<_> = join_all(handles)
                    .await
                    .into_iter()
                    .map(|joined| joined.unwrap())
                    .collect();

                let winners = results.iter().filter(|r| r.is_ok()).count();
                assert_eq!(winners, 1);
                assert!(results.iter().all(|r| match r {
                    Ok(_) => true,
                    Err(e) => matches!(e, LinkingError::Conflict { .. }),
                }));

                let active = store
                    .list_links(&LinkFilter::new().active(true))
                    .await
                    .unwrap();
                assert_eq!(active.len(), 1);
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn test_concurrent_redeem_single_winner() {
                let store = $factory;
                let token = store.insert_token(test_token(7, at(0), 30, true)).await.unwrap();

                let handles: Vec<_> = (0..8)
                    .map(|student| {
                        let store = store.clone();
                        let token_id = token.id;
                        tokio::spawn(async move {
                            store
                                .redeem_token(&token_id, StudentId(100 + student), at(1))
                                .await
                        })
                    })
                    .collect();
                let results: Vec<_> = join_all(handles)
                    .await
                    .into_iter()
                    .map(|joined| joined.unwrap())
                    .collect();

                assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
                assert!(results.iter().all(|r| match r {
                    Ok(_) => true,
                    Err(e) => matches!(e, LinkingError::AlreadyUsed { .. }),
                }));

                let links = store
                    .list_links(&LinkFilter::new().company(CompanyId(7)))
                    .await
                    .unwrap();
                assert_eq!(links.len(), 1);
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn test_concurrent_insert_request_single_winner() {
                let store = $factory;

                let handles: Vec<_> = (0..8)
                    .map(|i| {
                        let store = store.clone();
                        tokio::spawn(async move {
                            store.insert_request(pending_request(3, 7, at(i))).await
                        })
                    })
                    .collect();
                let winners = join_all(handles)
                    .await
                    .into_iter()
                    .filter(|joined| matches!(joined, Ok(Ok(_))))
                    .count();
                assert_eq!(winners, 1);

                let pending = store
                    .list_requests(&RequestFilter::new().status(RequestStatus::Pending))
                    .await
                    .unwrap();
                assert_eq!(pending.len(), 1);
            }
        }
    };
}
