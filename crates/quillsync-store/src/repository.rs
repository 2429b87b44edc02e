//! SQLite implementation of ILocalStore
//!
//! ## Storage strategy
//!
//! Each entity row keeps the columns the sync engine queries by (guid,
//! case-folded name, scope, dirty flag) and the complete entity as a
//! serde-JSON payload. Note payloads are stored *without* their resources;
//! resources live in their own table and are reassembled on read, so a
//! standalone resource update never rewrites its note's body.
//!
//! Scope filtering uses a single bind: `NULL` selects the user's own
//! scope, a guid selects that linked notebook's scope.

use sqlx::{Row, SqlitePool};

use quillsync_core::domain::{
    Guid, LinkedNotebook, Note, NoteSummary, Notebook, Resource, SavedSearch, Scope, Tag, User,
};
use quillsync_core::ports::ILocalStore;

use crate::StoreError;

/// SQLite-based implementation of the local store port.
///
/// All operations go through a connection pool; each call is atomic at
/// the granularity of one entity write.
pub struct SqliteLocalStore {
    pool: SqlitePool,
}

impl SqliteLocalStore {
    /// Creates a new store over the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(json: &str) -> Result<T, StoreError> {
    serde_json::from_str(json).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn name_key(name: Option<&str>) -> Option<String> {
    name.map(|n| n.trim().to_lowercase())
}

fn guid_str(guid: Option<&Guid>) -> Option<String> {
    guid.map(|g| g.as_str().to_string())
}

/// Scope bind value: `None` = user's own scope, `Some(guid)` = linked
/// notebook scope
fn scope_bind(scope: &Scope) -> Option<String> {
    scope.linked_notebook_guid().map(|g| g.as_str().to_string())
}

/// SQL fragment matching `linked_notebook_guid` against a single
/// scope bind (see [`scope_bind`])
const SCOPE_MATCH: &str = "((?1 IS NULL AND linked_notebook_guid IS NULL) \
                           OR (?1 IS NOT NULL AND linked_notebook_guid = ?1))";

impl SqliteLocalStore {
    async fn upsert_notebook(&self, notebook: &Notebook) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR REPLACE INTO notebooks \
             (local_id, guid, name_lower, linked_notebook_guid, locally_modified, payload) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(notebook.local_id.to_string())
        .bind(guid_str(notebook.guid.as_ref()))
        .bind(name_key(notebook.name.as_deref()))
        .bind(guid_str(notebook.linked_notebook_guid.as_ref()))
        .bind(notebook.locally_modified)
        .bind(to_json(notebook)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_tag(&self, tag: &Tag) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR REPLACE INTO tags \
             (local_id, guid, name_lower, parent_guid, linked_notebook_guid, \
              locally_modified, payload) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(tag.local_id.to_string())
        .bind(guid_str(tag.guid.as_ref()))
        .bind(name_key(tag.name.as_deref()))
        .bind(guid_str(tag.parent_guid.as_ref()))
        .bind(guid_str(tag.linked_notebook_guid.as_ref()))
        .bind(tag.locally_modified)
        .bind(to_json(tag)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_saved_search(&self, search: &SavedSearch) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR REPLACE INTO saved_searches \
             (local_id, guid, name_lower, locally_modified, payload) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(search.local_id.to_string())
        .bind(guid_str(search.guid.as_ref()))
        .bind(name_key(search.name.as_deref()))
        .bind(search.locally_modified)
        .bind(to_json(search)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Writes a note, its resources and its tag references
    async fn upsert_note(&self, note: &Note) -> Result<(), StoreError> {
        let local_id = note.local_id.to_string();

        // Note payload goes in without its resources; they have their own
        // table and are reattached on read.
        let mut stripped = note.clone();
        stripped.resources = Vec::new();

        sqlx::query(
            "INSERT OR REPLACE INTO notes \
             (local_id, guid, notebook_guid, notebook_local_id, usn, title, \
              locally_modified, payload) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&local_id)
        .bind(guid_str(note.guid.as_ref()))
        .bind(guid_str(note.notebook_guid.as_ref()))
        .bind(note.notebook_local_id.map(|id| id.to_string()))
        .bind(note.update_sequence_num)
        .bind(note.title.as_deref())
        .bind(note.locally_modified)
        .bind(to_json(&stripped)?)
        .execute(&self.pool)
        .await?;

        sqlx::query("DELETE FROM resources WHERE note_local_id = ?1")
            .bind(&local_id)
            .execute(&self.pool)
            .await?;
        for resource in &note.resources {
            self.upsert_resource(resource).await?;
        }

        sqlx::query("DELETE FROM note_tags WHERE note_local_id = ?1")
            .bind(&local_id)
            .execute(&self.pool)
            .await?;
        for tag_guid in &note.tag_guids {
            sqlx::query(
                "INSERT OR REPLACE INTO note_tags (note_local_id, tag_guid) VALUES (?1, ?2)",
            )
            .bind(&local_id)
            .bind(tag_guid.as_str())
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    async fn upsert_resource(&self, resource: &Resource) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR REPLACE INTO resources \
             (local_id, guid, note_guid, note_local_id, payload) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(resource.local_id.to_string())
        .bind(guid_str(resource.guid.as_ref()))
        .bind(guid_str(resource.note_guid.as_ref()))
        .bind(resource.note_local_id.map(|id| id.to_string()))
        .bind(to_json(resource)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_linked_notebook(
        &self,
        linked_notebook: &LinkedNotebook,
    ) -> Result<(), StoreError> {
        let guid = linked_notebook
            .guid
            .as_ref()
            .ok_or_else(|| {
                StoreError::Serialization("linked notebook has no guid".to_string())
            })?
            .as_str()
            .to_string();
        sqlx::query("INSERT OR REPLACE INTO linked_notebooks (guid, payload) VALUES (?1, ?2)")
            .bind(guid)
            .bind(to_json(linked_notebook)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Loads a note's resources back onto the stripped payload
    async fn attach_resources(&self, note: &mut Note) -> Result<(), StoreError> {
        let rows = sqlx::query("SELECT payload FROM resources WHERE note_local_id = ?1")
            .bind(note.local_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        let mut resources = Vec::with_capacity(rows.len());
        for row in rows {
            let payload: String = row.get("payload");
            resources.push(from_json::<Resource>(&payload)?);
        }
        note.resources = resources;
        Ok(())
    }

    /// Removes a set of notes together with their resources and tag links
    async fn delete_notes_by_local_ids(&self, local_ids: &[String]) -> Result<(), StoreError> {
        for local_id in local_ids {
            sqlx::query("DELETE FROM resources WHERE note_local_id = ?1")
                .bind(local_id)
                .execute(&self.pool)
                .await?;
            sqlx::query("DELETE FROM note_tags WHERE note_local_id = ?1")
                .bind(local_id)
                .execute(&self.pool)
                .await?;
            sqlx::query("DELETE FROM notes WHERE local_id = ?1")
                .bind(local_id)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    async fn note_local_ids_in_notebook(&self, guid: &Guid) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(
            "SELECT n.local_id FROM notes n \
             LEFT JOIN notebooks nb ON nb.guid = n.notebook_guid \
                                    OR nb.local_id = n.notebook_local_id \
             WHERE nb.guid = ?1",
        )
        .bind(guid.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|row| row.get("local_id")).collect())
    }
}

// ============================================================================
// ILocalStore implementation
// ============================================================================

#[async_trait::async_trait]
impl ILocalStore for SqliteLocalStore {
    async fn put_user(&self, user: &User) -> anyhow::Result<()> {
        let id = user
            .id
            .ok_or_else(|| anyhow::anyhow!("user record has no id"))?;
        sqlx::query("INSERT OR REPLACE INTO users (id, payload) VALUES (?1, ?2)")
            .bind(id.value())
            .bind(to_json(user)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // --- Notebooks ---

    async fn find_notebook_by_guid(&self, guid: &Guid) -> anyhow::Result<Option<Notebook>> {
        let row = sqlx::query("SELECT payload FROM notebooks WHERE guid = ?1")
            .bind(guid.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| from_json(r.get::<String, _>("payload").as_str()))
            .transpose()
            .map_err(Into::into)
    }

    async fn find_notebook_by_name(
        &self,
        name: &str,
        scope: &Scope,
    ) -> anyhow::Result<Option<Notebook>> {
        let sql = format!(
            "SELECT payload FROM notebooks WHERE {SCOPE_MATCH} AND name_lower = ?2"
        );
        let row = sqlx::query(&sql)
            .bind(scope_bind(scope))
            .bind(name.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| from_json(r.get::<String, _>("payload").as_str()))
            .transpose()
            .map_err(Into::into)
    }

    async fn add_notebook(&self, notebook: &Notebook) -> anyhow::Result<()> {
        self.upsert_notebook(notebook).await.map_err(Into::into)
    }

    async fn update_notebook(&self, notebook: &Notebook) -> anyhow::Result<()> {
        self.upsert_notebook(notebook).await.map_err(Into::into)
    }

    async fn expunge_notebook(&self, guid: &Guid) -> anyhow::Result<()> {
        let note_ids = self.note_local_ids_in_notebook(guid).await?;
        self.delete_notes_by_local_ids(&note_ids).await?;
        sqlx::query("DELETE FROM notebooks WHERE guid = ?1")
            .bind(guid.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_notebooks(&self, scope: &Scope) -> anyhow::Result<Vec<Notebook>> {
        let sql = format!("SELECT payload FROM notebooks WHERE {SCOPE_MATCH}");
        let rows = sqlx::query(&sql)
            .bind(scope_bind(scope))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|r| from_json(r.get::<String, _>("payload").as_str()).map_err(Into::into))
            .collect()
    }

    // --- Tags ---

    async fn find_tag_by_guid(&self, guid: &Guid) -> anyhow::Result<Option<Tag>> {
        let row = sqlx::query("SELECT payload FROM tags WHERE guid = ?1")
            .bind(guid.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| from_json(r.get::<String, _>("payload").as_str()))
            .transpose()
            .map_err(Into::into)
    }

    async fn find_tag_by_name(&self, name: &str, scope: &Scope) -> anyhow::Result<Option<Tag>> {
        let sql = format!("SELECT payload FROM tags WHERE {SCOPE_MATCH} AND name_lower = ?2");
        let row = sqlx::query(&sql)
            .bind(scope_bind(scope))
            .bind(name.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| from_json(r.get::<String, _>("payload").as_str()))
            .transpose()
            .map_err(Into::into)
    }

    async fn add_tag(&self, tag: &Tag) -> anyhow::Result<()> {
        self.upsert_tag(tag).await.map_err(Into::into)
    }

    async fn update_tag(&self, tag: &Tag) -> anyhow::Result<()> {
        self.upsert_tag(tag).await.map_err(Into::into)
    }

    async fn expunge_tag(&self, guid: &Guid) -> anyhow::Result<()> {
        // The tag and its child subtree go together
        sqlx::query(
            "DELETE FROM tags WHERE guid IN ( \
                 WITH RECURSIVE subtree(guid) AS ( \
                     SELECT ?1 \
                     UNION \
                     SELECT t.guid FROM tags t JOIN subtree s ON t.parent_guid = s.guid \
                 ) \
                 SELECT guid FROM subtree \
             )",
        )
        .bind(guid.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_tags(&self, scope: &Scope) -> anyhow::Result<Vec<Tag>> {
        let sql = format!("SELECT payload FROM tags WHERE {SCOPE_MATCH}");
        let rows = sqlx::query(&sql)
            .bind(scope_bind(scope))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|r| from_json(r.get::<String, _>("payload").as_str()).map_err(Into::into))
            .collect()
    }

    async fn expunge_noteless_linked_notebook_tags(&self) -> anyhow::Result<()> {
        sqlx::query(
            "DELETE FROM tags WHERE linked_notebook_guid IS NOT NULL \
             AND (guid IS NULL OR guid NOT IN (SELECT tag_guid FROM note_tags))",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // --- Saved searches ---

    async fn find_saved_search_by_guid(
        &self,
        guid: &Guid,
    ) -> anyhow::Result<Option<SavedSearch>> {
        let row = sqlx::query("SELECT payload FROM saved_searches WHERE guid = ?1")
            .bind(guid.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| from_json(r.get::<String, _>("payload").as_str()))
            .transpose()
            .map_err(Into::into)
    }

    async fn find_saved_search_by_name(
        &self,
        name: &str,
    ) -> anyhow::Result<Option<SavedSearch>> {
        let row = sqlx::query("SELECT payload FROM saved_searches WHERE name_lower = ?1")
            .bind(name.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| from_json(r.get::<String, _>("payload").as_str()))
            .transpose()
            .map_err(Into::into)
    }

    async fn add_saved_search(&self, search: &SavedSearch) -> anyhow::Result<()> {
        self.upsert_saved_search(search).await.map_err(Into::into)
    }

    async fn update_saved_search(&self, search: &SavedSearch) -> anyhow::Result<()> {
        self.upsert_saved_search(search).await.map_err(Into::into)
    }

    async fn expunge_saved_search(&self, guid: &Guid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM saved_searches WHERE guid = ?1")
            .bind(guid.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_saved_searches(&self) -> anyhow::Result<Vec<SavedSearch>> {
        let rows = sqlx::query("SELECT payload FROM saved_searches")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|r| from_json(r.get::<String, _>("payload").as_str()).map_err(Into::into))
            .collect()
    }

    // --- Notes ---

    async fn find_note_by_guid(&self, guid: &Guid) -> anyhow::Result<Option<Note>> {
        let row = sqlx::query("SELECT payload FROM notes WHERE guid = ?1")
            .bind(guid.as_str())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(r) => {
                let mut note: Note = from_json(r.get::<String, _>("payload").as_str())?;
                self.attach_resources(&mut note).await?;
                Ok(Some(note))
            }
            None => Ok(None),
        }
    }

    async fn add_note(&self, note: &Note) -> anyhow::Result<()> {
        self.upsert_note(note).await.map_err(Into::into)
    }

    async fn update_note(&self, note: &Note) -> anyhow::Result<()> {
        self.upsert_note(note).await.map_err(Into::into)
    }

    async fn expunge_note(&self, guid: &Guid) -> anyhow::Result<()> {
        let row = sqlx::query("SELECT local_id FROM notes WHERE guid = ?1")
            .bind(guid.as_str())
            .fetch_optional(&self.pool)
            .await?;
        if let Some(r) = row {
            let local_id: String = r.get("local_id");
            self.delete_notes_by_local_ids(&[local_id]).await?;
        }
        Ok(())
    }

    async fn list_note_summaries(&self, scope: &Scope) -> anyhow::Result<Vec<NoteSummary>> {
        // A note's scope is its notebook's scope; notes whose notebook is
        // unknown count as the user's own.
        let sql = "SELECT n.payload FROM notes n \
                   LEFT JOIN notebooks nb ON nb.guid = n.notebook_guid \
                                          OR nb.local_id = n.notebook_local_id \
                   WHERE (?1 IS NULL AND nb.linked_notebook_guid IS NULL) \
                      OR (?1 IS NOT NULL AND nb.linked_notebook_guid = ?1)";
        let rows = sqlx::query(sql)
            .bind(scope_bind(scope))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|r| {
                let note: Note = from_json(r.get::<String, _>("payload").as_str())?;
                Ok::<_, StoreError>(NoteSummary {
                    guid: note.guid,
                    local_id: note.local_id,
                    title: note.title,
                    update_sequence_num: note.update_sequence_num,
                    notebook_guid: note.notebook_guid,
                    locally_modified: note.locally_modified,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    // --- Resources ---

    async fn find_resource_by_guid(&self, guid: &Guid) -> anyhow::Result<Option<Resource>> {
        let row = sqlx::query("SELECT payload FROM resources WHERE guid = ?1")
            .bind(guid.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| from_json(r.get::<String, _>("payload").as_str()))
            .transpose()
            .map_err(Into::into)
    }

    async fn add_resource(&self, resource: &Resource) -> anyhow::Result<()> {
        self.upsert_resource(resource).await.map_err(Into::into)
    }

    async fn update_resource(&self, resource: &Resource) -> anyhow::Result<()> {
        self.upsert_resource(resource).await.map_err(Into::into)
    }

    // --- Linked notebooks ---

    async fn find_linked_notebook_by_guid(
        &self,
        guid: &Guid,
    ) -> anyhow::Result<Option<LinkedNotebook>> {
        let row = sqlx::query("SELECT payload FROM linked_notebooks WHERE guid = ?1")
            .bind(guid.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| from_json(r.get::<String, _>("payload").as_str()))
            .transpose()
            .map_err(Into::into)
    }

    async fn add_linked_notebook(&self, linked_notebook: &LinkedNotebook) -> anyhow::Result<()> {
        self.upsert_linked_notebook(linked_notebook)
            .await
            .map_err(Into::into)
    }

    async fn update_linked_notebook(
        &self,
        linked_notebook: &LinkedNotebook,
    ) -> anyhow::Result<()> {
        self.upsert_linked_notebook(linked_notebook)
            .await
            .map_err(Into::into)
    }

    async fn expunge_linked_notebook(&self, guid: &Guid) -> anyhow::Result<()> {
        // Content that arrived through the share goes with the reference
        let scope = Scope::LinkedNotebook(guid.clone());
        for notebook in self.list_notebooks(&scope).await? {
            if let Some(nb_guid) = &notebook.guid {
                let note_ids = self.note_local_ids_in_notebook(nb_guid).await?;
                self.delete_notes_by_local_ids(&note_ids).await?;
            }
            sqlx::query("DELETE FROM notebooks WHERE local_id = ?1")
                .bind(notebook.local_id.to_string())
                .execute(&self.pool)
                .await?;
        }
        sqlx::query("DELETE FROM tags WHERE linked_notebook_guid = ?1")
            .bind(guid.as_str())
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM linked_notebooks WHERE guid = ?1")
            .bind(guid.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_linked_notebooks(&self) -> anyhow::Result<Vec<LinkedNotebook>> {
        let rows = sqlx::query("SELECT payload FROM linked_notebooks")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|r| from_json(r.get::<String, _>("payload").as_str()).map_err(Into::into))
            .collect()
    }
}
