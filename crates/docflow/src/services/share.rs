//! Sharing fan-out: one document, N recipients, N assignments in one batch

use chrono::{DateTime, Utc};
use futures::future::join_all;

use super::DocumentWorkflow;
use crate::catalog::ShareBatch;
use crate::error::{DocflowError, DocflowResult};
use crate::models::{
    Assignment, AssignmentStatus, Document, ETag, Employee, ResolvedRecipient, ShareOutcome,
    ShareRequest, SharingUpdate, DEFAULT_URGENCY, SHARE_CATEGORY, SHARE_TAG, UNKNOWN_SHARER,
};
use crate::CallerIdentity;

impl DocumentWorkflow {
    /// Share a document with a set of recipients.
    ///
    /// Recipient ids that do not resolve to an employee are dropped silently;
    /// only the server log records them. With `if_match`, the
    /// batch only commits while the document still carries that ETag.
    pub async fn share(
        &self,
        document_id: &str,
        request: ShareRequest,
        caller: &CallerIdentity,
        if_match: Option<&ETag>,
    ) -> DocflowResult<ShareOutcome> {
        let doc = self.load_owned(document_id, caller, "share it").await?;
        let request = request.into_validated()?;

        let expected_revision = match if_match {
            Some(tag) => {
                let expected = tag.revision().ok_or_else(|| {
                    DocflowError::field("If-Match", "Malformed ETag")
                })?;
                if expected != doc.revision {
                    return Err(DocflowError::Conflict {
                        expected: tag.to_string(),
                        current: doc.etag().to_string(),
                    });
                }
                Some(expected)
            }
            None => None,
        };

        let (resolved, unresolved) = self.resolve_recipients(&request.employee_ids).await?;
        if resolved.is_empty() {
            return Err(DocflowError::field("employeeIds", "No valid recipients"));
        }
        if !unresolved.is_empty() {
            tracing::warn!(
                "Share of {} dropped {} unresolved recipient(s): {:?}",
                document_id,
                unresolved.len(),
                unresolved
            );
        }

        let now = Utc::now();
        let sharer = caller.display_identity().unwrap_or(UNKNOWN_SHARER);
        let assignments = resolved
            .iter()
            .map(|employee| self.assignment_for(&doc, employee, &request, sharer, now))
            .collect();

        let batch = ShareBatch {
            document_id: document_id.to_string(),
            expected_revision,
            assignments,
            sharing: SharingUpdate {
                shared_with: request.employee_ids.clone(),
                shared_department: request.department.clone(),
                shared_at: now,
                shared_by: caller.as_str().to_string(),
            },
        };

        let assignment_ids = self
            .catalog
            .commit_share(batch)
            .await
            .map_err(DocflowError::batch_commit)?;

        tracing::info!(
            document_id = %document_id,
            department = %request.department,
            "Shared with {} recipient(s)",
            assignment_ids.len()
        );

        Ok(ShareOutcome {
            success: true,
            assignment_ids,
            resolved_recipients: resolved.iter().map(ResolvedRecipient::from).collect(),
        })
    }

    /// Look every id up concurrently; order follows the request.
    async fn resolve_recipients(
        &self,
        ids: &[String],
    ) -> DocflowResult<(Vec<Employee>, Vec<String>)> {
        let lookups = join_all(ids.iter().map(|id| self.catalog.get_employee(id))).await;

        let mut resolved = Vec::new();
        let mut unresolved = Vec::new();
        for (id, lookup) in ids.iter().zip(lookups) {
            match lookup? {
                Some(employee) => resolved.push(employee),
                None => unresolved.push(id.clone()),
            }
        }
        Ok((resolved, unresolved))
    }

    fn assignment_for(
        &self,
        doc: &Document,
        employee: &Employee,
        request: &ShareRequest,
        sharer: &str,
        now: DateTime<Utc>,
    ) -> Assignment {
        let description = request.message.clone().unwrap_or_else(|| {
            format!(
                "Please review the document \"{}\" shared by {}. {}",
                doc.title,
                sharer,
                doc.description.as_deref().unwrap_or_default()
            )
            .trim()
            .to_string()
        });

        let mut tags = vec![SHARE_TAG.to_string(), request.department.clone()];
        tags.extend(doc.tags.iter().cloned());

        Assignment {
            id: None,
            title: format!("Review Document: {}", doc.title),
            description,
            assigned_by: sharer.to_string(),
            assigned_date: now.date_naive(),
            deadline: (now + self.config.assignment_deadline()).date_naive(),
            urgency: doc
                .urgency
                .clone()
                .unwrap_or_else(|| DEFAULT_URGENCY.to_string()),
            status: AssignmentStatus::Planning,
            progress: 0,
            category: SHARE_CATEGORY.to_string(),
            documents: 1,
            collaborators: vec![sharer.to_string()],
            tags,
            estimated_hours: self.config.assignment_estimated_hours,
            spent_hours: 0,
            assigned_to: employee.id.clone(),
            sector: request.department.clone(),
            related_document_id: doc.id_str().to_string(),
            created_at: now,
        }
    }
}
