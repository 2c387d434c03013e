use std::path::Path;

use camino::Utf8Path;
use serde::Serialize;
use tracing::info;

use crate::edit::{
    EditSummary, EditableRecord, apply_field_edits, build_display_view, build_editable_view,
    build_write_instructions, summarize_edit,
};
use crate::error::MetaError;
use crate::exiftool::TagTool;
use crate::gps::{GpsCoordinate, LatitudeRef, LongitudeRef, extract_coordinate};
use crate::pipeline::{CommitPipeline, CommitReport};
use crate::store::{ManagedStore, StoredFile};
use crate::tag::MetadataRecord;

#[derive(Debug, Clone, Serialize)]
pub struct InspectResult {
    pub file_id: String,
    pub metadata: EditableRecord,
    pub editable: EditableRecord,
    pub gps: Option<GpsView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GpsView {
    pub lat: f64,
    pub lng: f64,
    pub latitude_ref: LatitudeRef,
    pub longitude_ref: LongitudeRef,
    pub map_url: String,
}

impl From<GpsCoordinate> for GpsView {
    fn from(value: GpsCoordinate) -> Self {
        Self {
            lat: value.lat,
            lng: value.lng,
            latitude_ref: value.latitude_ref(),
            longitude_ref: value.longitude_ref(),
            map_url: value.map_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EditResult {
    pub success: bool,
    pub summary: EditSummary,
    pub commit: CommitReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct StripResult {
    pub success: bool,
    pub commit: CommitReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub success: bool,
    pub file_id: String,
    pub original_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub success: bool,
    pub file_id: String,
    pub destination: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub root: String,
    pub files: Vec<StoredFile>,
}

pub struct App<T: TagTool> {
    store: ManagedStore,
    tool: T,
}

impl<T: TagTool> App<T> {
    pub fn new(store: ManagedStore, tool: T) -> Self {
        Self { store, tool }
    }

    pub fn store(&self) -> &ManagedStore {
        &self.store
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    pub fn read(&self, file_id: &str) -> Result<MetadataRecord, MetaError> {
        let path = self.store.resolve_existing(file_id)?;
        self.tool.read(path.as_std_path())
    }

    pub fn inspect(&self, file_id: &str) -> Result<InspectResult, MetaError> {
        let record = self.read(file_id)?;
        Ok(InspectResult {
            file_id: file_id.to_string(),
            metadata: build_display_view(&record),
            editable: build_editable_view(&record),
            gps: extract_coordinate(&record).map(GpsView::from),
        })
    }

    pub fn editable_view(&self, file_id: &str) -> Result<EditableRecord, MetaError> {
        Ok(build_editable_view(&self.read(file_id)?))
    }

    pub fn gps(&self, file_id: &str) -> Result<Option<GpsCoordinate>, MetaError> {
        Ok(extract_coordinate(&self.read(file_id)?))
    }

    pub fn update(&self, file_id: &str, submitted: &EditableRecord) -> Result<EditResult, MetaError> {
        let previous = self.editable_view(file_id)?;
        let summary = summarize_edit(&previous, submitted);
        let instructions = build_write_instructions(&previous, submitted);
        let commit = CommitPipeline::new(&self.store, &self.tool).commit(file_id, &instructions)?;
        info!(
            file = %file_id,
            added = summary.added.len(),
            removed = summary.removed.len(),
            changed = summary.changed.len(),
            "metadata updated"
        );
        Ok(EditResult {
            success: true,
            summary,
            commit,
        })
    }

    pub fn edit_fields(
        &self,
        file_id: &str,
        sets: &[String],
        unsets: &[String],
    ) -> Result<EditResult, MetaError> {
        let previous = self.editable_view(file_id)?;
        let submitted = apply_field_edits(&previous, sets, unsets)?;
        self.update(file_id, &submitted)
    }

    pub fn strip(&self, file_id: &str) -> Result<StripResult, MetaError> {
        let commit = CommitPipeline::new(&self.store, &self.tool).delete_all(file_id)?;
        info!(file = %file_id, "metadata stripped");
        Ok(StripResult {
            success: true,
            commit,
        })
    }

    pub fn import(&self, source: &Path) -> Result<ImportResult, MetaError> {
        let file_id = self.store.import(source)?;
        info!(file = %file_id, source = %source.display(), "file imported");
        Ok(ImportResult {
            success: true,
            file_id,
            original_name: source
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default(),
        })
    }

    pub fn export(&self, file_id: &str, dest: &Utf8Path) -> Result<ExportResult, MetaError> {
        self.store.export(file_id, dest)?;
        Ok(ExportResult {
            success: true,
            file_id: file_id.to_string(),
            destination: dest.to_string(),
        })
    }

    pub fn list(&self) -> Result<ListResult, MetaError> {
        Ok(ListResult {
            root: self.store.root().to_string(),
            files: self.store.list()?,
        })
    }
}
