//! Cross-vault move engine.
//!
//! Asset moves are one transaction: the relocated document, the source
//! delete and both vaults' counters commit together. Collection moves cannot
//! fit in one write group, so they run as a durable [`MoveJob`]:
//!
//! ```text
//! CreatingDestination -> MigratingAssets(cursor) -> DeletingSource -> PurgingGrants -> Completed
//!          \__________________\___________________________\________________\-> Failed(resume_phase)
//! ```
//!
//! Every phase commits its own transaction together with the job record, and
//! the source collection is deleted only after all of its assets have moved.
//! A failed or interrupted job resumes from the phase it stopped in.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::domain::access::VaultAccess;
use crate::domain::audit::AuditEventType;
use crate::domain::governance::Governance;
use crate::domain::paths;
use crate::domain::ports::{
    DocPath, MoveAssetRequest, MoveAssetResponse, MoveCollectionRequest, MoveCommand,
    MoveJobRequest, Query, TxPlan, TxSnapshot, WriteOp, encode_value, run_transaction,
};
use crate::domain::purge::purge_resource_grants;
use crate::domain::usage::{check_capacity, counters_in, write_counters};
use crate::domain::{
    Asset, AssetId, Caller, CapacityField, Collection, CollectionId, Error, GrantScope, JobId,
    MoveJob, MovePhase, MovedFrom, QuotaKind, ResolvedPlan, UserId, VaultId,
};

/// Assets migrated per write group: two writes each plus counters and job.
pub const MOVE_PAGE_SIZE: usize = 200;

/// Implements [`MoveCommand`].
#[derive(Clone)]
pub struct MoveService {
    governance: Governance,
}

/// Owner access to both ends of a move.
struct MoveAccess {
    source: VaultAccess,
    target: Option<VaultAccess>,
}

impl MoveAccess {
    fn target(&self) -> &VaultAccess {
        self.target.as_ref().unwrap_or(&self.source)
    }
}

fn job_in(snapshot: &TxSnapshot, path: &DocPath, expected: MovePhase) -> Result<MoveJob, Error> {
    let job: MoveJob = snapshot
        .decode(path)?
        .ok_or_else(|| Error::not_found("Move job not found"))?;
    if job.phase != expected {
        return Err(Error::conflict("Move job advanced concurrently")
            .with_details(json!({ "jobId": job.id, "phase": job.phase })));
    }
    Ok(job)
}

fn with_job_details(error: Error, job: &MoveJob) -> Error {
    let mut details = error.details().cloned().unwrap_or_else(|| json!({}));
    if let Value::Object(fields) = &mut details {
        fields.insert("jobId".to_owned(), json!(job.id));
        fields.insert("phase".to_owned(), json!(job.resume_phase.unwrap_or(job.phase)));
    }
    error.with_details(details)
}

fn moved_from(job: &MoveJob, asset_id: Option<AssetId>, now: chrono::DateTime<chrono::Utc>) -> MovedFrom {
    MovedFrom {
        vault_id: job.source_vault_id.clone(),
        collection_id: job.source_collection_id.clone(),
        asset_id,
        moved_at: now,
        moved_by: job.actor_id.clone(),
    }
}

impl MoveService {
    pub fn new(governance: Governance) -> Self {
        Self { governance }
    }

    async fn owner_access(
        &self,
        caller: &Caller,
        source_vault_id: &VaultId,
        target_vault_id: &VaultId,
    ) -> Result<MoveAccess, Error> {
        let source = self.governance.access(source_vault_id, caller).await?;
        source.require_owner()?;
        let target = if target_vault_id == source_vault_id {
            None
        } else {
            let target = self.governance.access(target_vault_id, caller).await?;
            target.require_owner()?;
            Some(target)
        };
        Ok(MoveAccess { source, target })
    }

    /// Consume one destructive unit per distinct vault. Returns both plans.
    async fn consume_destructive(
        &self,
        access: &MoveAccess,
        actor: &UserId,
    ) -> Result<(ResolvedPlan, ResolvedPlan), Error> {
        let quotas = &self.governance.quotas;
        let source_plan = quotas
            .consume(&access.source.vault, actor, QuotaKind::Destructive, 1)
            .await?;
        let target_plan = match &access.target {
            Some(target) => {
                quotas
                    .consume(&target.vault, actor, QuotaKind::Destructive, 1)
                    .await?
            }
            None => source_plan,
        };
        Ok((source_plan, target_plan))
    }

    async fn move_within_vault(
        &self,
        request: &MoveAssetRequest,
        asset_id: &AssetId,
    ) -> Result<Asset, Error> {
        let vault_id = &request.source_vault_id;
        let asset_path = paths::asset(vault_id, asset_id);
        let collection_path = paths::collection(vault_id, &request.target_collection_id);
        let reads = [asset_path.clone(), collection_path.clone()];
        let now = self.governance.clock.utc();
        run_transaction(
            self.governance.store.as_ref(),
            &reads,
            |snapshot| -> Result<TxPlan<Asset>, Error> {
                let mut asset: Asset = snapshot
                    .decode(&asset_path)?
                    .ok_or_else(|| Error::not_found("Asset not found"))?;
                if !snapshot.exists(&collection_path) {
                    return Err(Error::not_found("Target collection not found"));
                }
                asset.moved_from = Some(MovedFrom {
                    vault_id: vault_id.clone(),
                    collection_id: asset.collection_id.clone(),
                    asset_id: Some(asset.id.clone()),
                    moved_at: now,
                    moved_by: request.caller.user_id.clone(),
                });
                asset.collection_id = request.target_collection_id.clone();
                asset.last_edited_at = now;
                Ok(TxPlan::new(
                    vec![WriteOp::put(asset_path.clone(), &asset)?],
                    asset,
                ))
            },
        )
        .await
    }

    async fn move_across_vaults(
        &self,
        request: &MoveAssetRequest,
        target_plan: &ResolvedPlan,
    ) -> Result<(Asset, bool), Error> {
        let source_vault = &request.source_vault_id;
        let target_vault = &request.target_vault_id;
        let asset_id = &request.asset_id;
        let usage = &self.governance.usage;
        usage.ensure(source_vault).await?;
        let cached = usage.ensure(target_vault).await?;
        check_capacity(target_plan, &cached, CapacityField::Assets, 1)?;

        let source_path = paths::asset(source_vault, asset_id);
        let same_id_path = paths::asset(target_vault, asset_id);
        let collection_path = paths::collection(target_vault, &request.target_collection_id);
        let reads = [
            source_path.clone(),
            same_id_path.clone(),
            collection_path.clone(),
            paths::counters(source_vault),
            paths::counters(target_vault),
        ];
        let now = self.governance.clock.utc();

        run_transaction(
            self.governance.store.as_ref(),
            &reads,
            |snapshot| -> Result<TxPlan<(Asset, bool)>, Error> {
                let original: Asset = snapshot
                    .decode(&source_path)?
                    .ok_or_else(|| Error::not_found("Asset not found"))?;
                if !snapshot.exists(&collection_path) {
                    return Err(Error::not_found("Target collection not found"));
                }
                let target_counters = counters_in(snapshot, target_vault)?;
                check_capacity(target_plan, &target_counters, CapacityField::Assets, 1)?;
                let source_counters = counters_in(snapshot, source_vault)?;

                let renamed = snapshot.exists(&same_id_path);
                let id = if renamed {
                    AssetId::generate()
                } else {
                    original.id.clone()
                };
                let moved = Asset {
                    id: id.clone(),
                    collection_id: request.target_collection_id.clone(),
                    last_edited_at: now,
                    moved_from: Some(MovedFrom {
                        vault_id: source_vault.clone(),
                        collection_id: original.collection_id.clone(),
                        asset_id: Some(original.id.clone()),
                        moved_at: now,
                        moved_by: request.caller.user_id.clone(),
                    }),
                    ..original
                };
                Ok(TxPlan::new(
                    vec![
                        WriteOp::put(paths::asset(target_vault, &id), &moved)?,
                        WriteOp::delete(source_path.clone()),
                        write_counters(
                            source_vault,
                            &source_counters.adjusted(CapacityField::Assets, -1),
                        )?,
                        write_counters(
                            target_vault,
                            &target_counters.adjusted(CapacityField::Assets, 1),
                        )?,
                    ],
                    (moved, renamed),
                ))
            },
        )
        .await
    }

    async fn load_job(&self, vault_id: &VaultId, job_id: &JobId) -> Result<MoveJob, Error> {
        let doc = self
            .governance
            .store
            .get(&paths::move_job(vault_id, job_id))
            .await?
            .ok_or_else(|| Error::not_found("Move job not found"))?;
        Ok(doc.decode()?)
    }

    /// Run `job` phase by phase until it completes or fails.
    async fn drive(&self, mut job: MoveJob, target_plan: ResolvedPlan) -> Result<MoveJob, Error> {
        while !job.phase.is_terminal() {
            let phase = job.phase;
            let step = match phase {
                MovePhase::CreatingDestination => self.create_destination(&job, &target_plan).await,
                MovePhase::MigratingAssets => self.migrate_page(&job, &target_plan).await,
                MovePhase::DeletingSource => self.delete_source(&job).await,
                MovePhase::PurgingGrants => self.purge_grants(&job).await,
                MovePhase::Completed | MovePhase::Failed => break,
            };
            match step {
                Ok(next) => job = next,
                Err(error) => {
                    let failed = self.mark_failed(&job, phase, &error).await;
                    return Err(with_job_details(error, &failed));
                }
            }
        }
        Ok(job)
    }

    async fn mark_failed(&self, job: &MoveJob, phase: MovePhase, error: &Error) -> MoveJob {
        warn!(job_id = %job.id, ?phase, %error, "collection move failed");
        let mut failed = job.clone();
        failed.phase = MovePhase::Failed;
        failed.resume_phase = Some(phase);
        failed.error = Some(error.message().to_owned());
        failed.updated_at = self.governance.clock.utc();
        if let Err(write_error) = self.save_job(&failed).await {
            warn!(job_id = %job.id, error = %write_error, "could not record move job failure");
        }
        failed
    }

    async fn save_job(&self, job: &MoveJob) -> Result<(), Error> {
        let path = paths::move_job(&job.source_vault_id, &job.id);
        self.governance
            .store
            .set(&path, encode_value(job)?, false)
            .await?;
        Ok(())
    }

    /// Job-only phase transition guarded against concurrent drivers.
    async fn advance(&self, job: &MoveJob, next: MovePhase, cursor: Option<String>) -> Result<MoveJob, Error> {
        let job_path = paths::move_job(&job.source_vault_id, &job.id);
        let now = self.governance.clock.utc();
        run_transaction(
            self.governance.store.as_ref(),
            std::slice::from_ref(&job_path),
            |snapshot| -> Result<TxPlan<MoveJob>, Error> {
                let mut current = job_in(snapshot, &job_path, job.phase)?;
                current.phase = next;
                current.cursor = cursor.clone();
                current.updated_at = now;
                Ok(TxPlan::new(
                    vec![WriteOp::put(job_path.clone(), &current)?],
                    current,
                ))
            },
        )
        .await
    }

    async fn create_destination(&self, job: &MoveJob, target_plan: &ResolvedPlan) -> Result<MoveJob, Error> {
        let source_path = paths::collection(&job.source_vault_id, &job.source_collection_id);
        let target_path = paths::collection(&job.target_vault_id, &job.target_collection_id);
        let job_path = paths::move_job(&job.source_vault_id, &job.id);
        let reads = [
            source_path.clone(),
            target_path.clone(),
            paths::counters(&job.target_vault_id),
            job_path.clone(),
        ];
        let now = self.governance.clock.utc();
        self.governance.usage.ensure(&job.target_vault_id).await?;

        run_transaction(
            self.governance.store.as_ref(),
            &reads,
            |snapshot| -> Result<TxPlan<MoveJob>, Error> {
                let mut next = job_in(snapshot, &job_path, MovePhase::CreatingDestination)?;
                next.phase = MovePhase::MigratingAssets;
                next.updated_at = now;
                let mut writes = Vec::with_capacity(3);
                if !snapshot.exists(&target_path) {
                    let source: Collection = snapshot
                        .decode(&source_path)?
                        .ok_or_else(|| Error::not_found("Source collection not found"))?;
                    let counters = counters_in(snapshot, &job.target_vault_id)?;
                    check_capacity(target_plan, &counters, CapacityField::Collections, 1)?;
                    let destination = Collection {
                        id: job.target_collection_id.clone(),
                        last_edited_at: now,
                        moved_from: Some(moved_from(job, None, now)),
                        ..source
                    };
                    writes.push(WriteOp::put(target_path.clone(), &destination)?);
                    writes.push(write_counters(
                        &job.target_vault_id,
                        &counters.adjusted(CapacityField::Collections, 1),
                    )?);
                }
                writes.push(WriteOp::put(job_path.clone(), &next)?);
                Ok(TxPlan::new(writes, next))
            },
        )
        .await
    }

    /// Migrate one page of assets, or finish the phase when none remain.
    async fn migrate_page(&self, job: &MoveJob, target_plan: &ResolvedPlan) -> Result<MoveJob, Error> {
        let store = self.governance.store.as_ref();
        let source_assets = paths::assets(&job.source_vault_id);
        let cursor = job.cursor.as_deref().and_then(DocPath::parse);
        let query = Query::collection(source_assets)
            .where_eq("collectionId", job.source_collection_id.as_str())
            .start_after(cursor)
            .limit(MOVE_PAGE_SIZE);
        let page = store.query(&query).await?;
        if page.is_empty() {
            // Sweep once more from the start for assets created behind the cursor.
            return if job.cursor.is_some() {
                self.advance(job, MovePhase::MigratingAssets, None).await
            } else {
                self.advance(job, MovePhase::DeletingSource, None).await
            };
        }

        self.governance.usage.ensure(&job.source_vault_id).await?;
        self.governance.usage.ensure(&job.target_vault_id).await?;
        let source_paths: Vec<DocPath> = page.into_iter().map(|doc| doc.path).collect();
        let target_assets = paths::assets(&job.target_vault_id);
        let target_paths: Vec<DocPath> = source_paths
            .iter()
            .map(|path| target_assets.doc(path.id()))
            .collect();
        let job_path = paths::move_job(&job.source_vault_id, &job.id);
        let mut reads = Vec::with_capacity(source_paths.len() * 2 + 3);
        reads.extend(source_paths.iter().cloned());
        reads.extend(target_paths.iter().cloned());
        reads.push(paths::counters(&job.source_vault_id));
        reads.push(paths::counters(&job.target_vault_id));
        reads.push(job_path.clone());
        let now = self.governance.clock.utc();

        let (next, moved_ids) = run_transaction(
            store,
            &reads,
            |snapshot| -> Result<TxPlan<(MoveJob, Vec<String>)>, Error> {
                let mut next = job_in(snapshot, &job_path, MovePhase::MigratingAssets)?;
                let mut writes = Vec::with_capacity(source_paths.len() * 2 + 3);
                let mut moved_ids = Vec::with_capacity(source_paths.len());
                let mut renamed = 0_u64;
                for (source_path, same_id_path) in source_paths.iter().zip(&target_paths) {
                    let Some(original) = snapshot.decode::<Asset>(source_path)? else {
                        continue;
                    };
                    let id = if snapshot.exists(same_id_path) {
                        renamed += 1;
                        AssetId::generate()
                    } else {
                        original.id.clone()
                    };
                    let moved = Asset {
                        id: id.clone(),
                        collection_id: job.target_collection_id.clone(),
                        last_edited_at: now,
                        moved_from: Some(moved_from(job, Some(original.id.clone()), now)),
                        ..original
                    };
                    writes.push(WriteOp::put(paths::asset(&job.target_vault_id, &id), &moved)?);
                    writes.push(WriteOp::delete(source_path.clone()));
                    moved_ids.push(source_path.id().to_owned());
                }

                let count = moved_ids.len() as u64;
                if count > 0 {
                    let target_counters = counters_in(snapshot, &job.target_vault_id)?;
                    check_capacity(target_plan, &target_counters, CapacityField::Assets, count)?;
                    let source_counters = counters_in(snapshot, &job.source_vault_id)?;
                    let delta = count as i64;
                    writes.push(write_counters(
                        &job.source_vault_id,
                        &source_counters.adjusted(CapacityField::Assets, -delta),
                    )?);
                    writes.push(write_counters(
                        &job.target_vault_id,
                        &target_counters.adjusted(CapacityField::Assets, delta),
                    )?);
                }
                next.cursor = source_paths.last().map(|path| path.as_str().to_owned());
                next.moved_assets += count;
                next.renamed_assets += renamed;
                next.updated_at = now;
                writes.push(WriteOp::put(job_path.clone(), &next)?);
                Ok(TxPlan::new(writes, (next, moved_ids)))
            },
        )
        .await?;

        for asset_id in &moved_ids {
            purge_resource_grants(store, &job.source_vault_id, GrantScope::Asset, asset_id).await;
        }
        info!(job_id = %job.id, moved = moved_ids.len(), total = next.moved_assets, "move page committed");
        Ok(next)
    }

    async fn delete_source(&self, job: &MoveJob) -> Result<MoveJob, Error> {
        let source_path = paths::collection(&job.source_vault_id, &job.source_collection_id);
        let job_path = paths::move_job(&job.source_vault_id, &job.id);
        let reads = [
            source_path.clone(),
            paths::counters(&job.source_vault_id),
            job_path.clone(),
        ];
        let now = self.governance.clock.utc();
        self.governance.usage.ensure(&job.source_vault_id).await?;
        run_transaction(
            self.governance.store.as_ref(),
            &reads,
            |snapshot| -> Result<TxPlan<MoveJob>, Error> {
                let mut next = job_in(snapshot, &job_path, MovePhase::DeletingSource)?;
                next.phase = MovePhase::PurgingGrants;
                next.updated_at = now;
                let mut writes = Vec::with_capacity(3);
                if snapshot.exists(&source_path) {
                    let counters = counters_in(snapshot, &job.source_vault_id)?
                        .adjusted(CapacityField::Collections, -1);
                    writes.push(WriteOp::delete(source_path.clone()));
                    writes.push(write_counters(&job.source_vault_id, &counters)?);
                }
                writes.push(WriteOp::put(job_path.clone(), &next)?);
                Ok(TxPlan::new(writes, next))
            },
        )
        .await
    }

    async fn purge_grants(&self, job: &MoveJob) -> Result<MoveJob, Error> {
        purge_resource_grants(
            self.governance.store.as_ref(),
            &job.source_vault_id,
            GrantScope::Collection,
            job.source_collection_id.as_str(),
        )
        .await;
        self.advance(job, MovePhase::Completed, job.cursor.clone()).await
    }

    async fn target_plan(&self, job: &MoveJob, access: &MoveAccess) -> Result<ResolvedPlan, Error> {
        self.governance.plans.resolve(&access.target().vault).await.map_err(|error| {
            warn!(job_id = %job.id, %error, "could not resolve target plan");
            error
        })
    }

    async fn audit_completion(&self, job: &MoveJob, access: &MoveAccess) {
        let payload = json!({
            "jobId": job.id,
            "sourceVaultId": job.source_vault_id,
            "sourceCollectionId": job.source_collection_id,
            "targetVaultId": job.target_vault_id,
            "targetCollectionId": job.target_collection_id,
            "movedAssets": job.moved_assets,
            "renamedAssets": job.renamed_assets,
        });
        let audit = &self.governance.audit;
        audit
            .record_vault_event(&access.source.vault, &job.actor_id, AuditEventType::CollectionMoved, payload.clone())
            .await;
        if let Some(target) = &access.target {
            audit
                .record_vault_event(&target.vault, &job.actor_id, AuditEventType::CollectionMoved, payload)
                .await;
        }
    }

    async fn run_to_end(&self, job: MoveJob, access: &MoveAccess) -> Result<MoveJob, Error> {
        let target_plan = self.target_plan(&job, access).await?;
        let finished = self.drive(job, target_plan).await?;
        if finished.phase == MovePhase::Completed {
            info!(job_id = %finished.id, moved = finished.moved_assets, renamed = finished.renamed_assets, "collection move completed");
            self.audit_completion(&finished, access).await;
        }
        Ok(finished)
    }
}

#[async_trait]
impl MoveCommand for MoveService {
    async fn move_asset(&self, request: MoveAssetRequest) -> Result<MoveAssetResponse, Error> {
        let access = self
            .owner_access(&request.caller, &request.source_vault_id, &request.target_vault_id)
            .await?;
        let actor = &request.caller.user_id;
        let (source_plan, target_plan) = self.consume_destructive(&access, actor).await?;

        let (asset, renamed) = if access.target.is_none() {
            (self.move_within_vault(&request, &request.asset_id).await?, false)
        } else {
            let moved = self.move_across_vaults(&request, &target_plan).await?;
            purge_resource_grants(
                self.governance.store.as_ref(),
                &request.source_vault_id,
                GrantScope::Asset,
                request.asset_id.as_str(),
            )
            .await;
            moved
        };

        info!(
            source_vault_id = %request.source_vault_id,
            target_vault_id = %request.target_vault_id,
            asset_id = %asset.id,
            renamed,
            "asset moved"
        );
        let payload = json!({
            "assetId": request.asset_id,
            "newAssetId": asset.id,
            "sourceVaultId": request.source_vault_id,
            "targetVaultId": request.target_vault_id,
            "targetCollectionId": request.target_collection_id,
        });
        let audit = &self.governance.audit;
        audit
            .record_with_plan(&request.source_vault_id, &source_plan, actor, AuditEventType::AssetMoved, payload.clone())
            .await;
        if access.target.is_some() {
            audit
                .record_with_plan(&request.target_vault_id, &target_plan, actor, AuditEventType::AssetMoved, payload)
                .await;
        }
        Ok(MoveAssetResponse {
            asset,
            source_vault_id: request.source_vault_id,
            target_vault_id: request.target_vault_id,
            renamed,
        })
    }

    async fn move_collection(&self, request: MoveCollectionRequest) -> Result<MoveJob, Error> {
        if request.source_vault_id == request.target_vault_id {
            return Err(Error::invalid_request(
                "Collections can only be moved to another vault",
            ));
        }
        let access = self
            .owner_access(&request.caller, &request.source_vault_id, &request.target_vault_id)
            .await?;
        let store = self.governance.store.as_ref();
        let source_path = paths::collection(&request.source_vault_id, &request.collection_id);
        if store.get(&source_path).await?.is_none() {
            return Err(Error::not_found("Collection not found"));
        }

        let actor = &request.caller.user_id;
        let (_, target_plan) = self.consume_destructive(&access, actor).await?;
        self.governance
            .quotas
            .consume(&access.source.vault, actor, QuotaKind::Bulk, 1)
            .await?;

        let asset_count = store
            .count(
                &Query::collection(paths::assets(&request.source_vault_id))
                    .where_eq("collectionId", request.collection_id.as_str()),
            )
            .await?;
        let target_usage = self.governance.usage.ensure(&request.target_vault_id).await?;
        check_capacity(&target_plan, &target_usage, CapacityField::Collections, 1)?;
        check_capacity(&target_plan, &target_usage, CapacityField::Assets, asset_count)?;

        let target_collection_id = if store
            .get(&paths::collection(&request.target_vault_id, &request.collection_id))
            .await?
            .is_some()
        {
            CollectionId::generate()
        } else {
            request.collection_id.clone()
        };
        let now = self.governance.clock.utc();
        let job = MoveJob {
            id: JobId::generate(),
            actor_id: actor.clone(),
            source_vault_id: request.source_vault_id.clone(),
            source_collection_id: request.collection_id.clone(),
            target_vault_id: request.target_vault_id.clone(),
            target_collection_id,
            phase: MovePhase::CreatingDestination,
            resume_phase: None,
            cursor: None,
            moved_assets: 0,
            renamed_assets: 0,
            error: None,
            created_at: now,
            updated_at: now,
        };
        let job_path = paths::move_job(&job.source_vault_id, &job.id);
        if !store.create_if_absent(&job_path, encode_value(&job)?).await? {
            return Err(Error::conflict("Move job already exists"));
        }
        info!(job_id = %job.id, source_vault_id = %job.source_vault_id, target_vault_id = %job.target_vault_id, asset_count, "collection move started");
        self.run_to_end(job, &access).await
    }

    async fn resume_move(&self, request: MoveJobRequest) -> Result<MoveJob, Error> {
        let mut job = self.load_job(&request.vault_id, &request.job_id).await?;
        let access = self
            .owner_access(&request.caller, &job.source_vault_id, &job.target_vault_id)
            .await?;
        match job.phase {
            MovePhase::Completed => return Ok(job),
            MovePhase::Failed => {
                job.phase = job.resume_phase.unwrap_or(MovePhase::CreatingDestination);
                job.resume_phase = None;
                job.error = None;
                job.updated_at = self.governance.clock.utc();
                self.save_job(&job).await?;
                info!(job_id = %job.id, phase = ?job.phase, "collection move resumed");
            }
            _ => info!(job_id = %job.id, phase = ?job.phase, "continuing interrupted collection move"),
        }
        self.run_to_end(job, &access).await
    }

    async fn move_job(&self, request: MoveJobRequest) -> Result<MoveJob, Error> {
        let access = self
            .governance
            .access(&request.vault_id, &request.caller)
            .await?;
        access.require_owner()?;
        self.load_job(&request.vault_id, &request.job_id).await
    }
}
