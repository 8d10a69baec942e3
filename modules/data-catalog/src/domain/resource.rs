//! Registry of catalog resource kinds.
//!
//! Each entry binds a kind to its storage collection, its URL segment and its
//! attribute schema. Stores, routes and the OpenAPI document are all built
//! from this table.

use std::fmt;

use super::engine::CollectionKind;
use super::schema::{AttrRule, AttrType, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    SurveyArea,
    Dataset,
    Datafile,
    Contains,
    Produces,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::SurveyArea,
        ResourceKind::Dataset,
        ResourceKind::Datafile,
        ResourceKind::Contains,
        ResourceKind::Produces,
    ];

    #[must_use]
    pub fn spec(self) -> &'static ResourceSpec {
        match self {
            ResourceKind::SurveyArea => &SURVEY_AREA,
            ResourceKind::Dataset => &DATASET,
            ResourceKind::Datafile => &DATAFILE,
            ResourceKind::Contains => &CONTAINS,
            ResourceKind::Produces => &PRODUCES,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec().singular)
    }
}

/// Static description of one resource kind.
#[derive(Debug)]
pub struct ResourceSpec {
    pub kind: ResourceKind,
    /// Storage collection name.
    pub collection: &'static str,
    /// URL path segment, without slashes.
    pub segment: &'static str,
    pub singular: &'static str,
    pub plural: &'static str,
    /// OpenAPI tag.
    pub tag: &'static str,
    pub schema: Schema,
}

impl ResourceSpec {
    #[must_use]
    pub fn is_edge(&self) -> bool {
        self.schema.edge
    }

    #[must_use]
    pub fn collection_kind(&self) -> CollectionKind {
        if self.is_edge() {
            CollectionKind::Edge
        } else {
            CollectionKind::Document
        }
    }

    /// Collection path, e.g. `/surveyarea`.
    #[must_use]
    pub fn base_path(&self) -> String {
        format!("/{}", self.segment)
    }
}

pub static SURVEY_AREA: ResourceSpec = ResourceSpec {
    kind: ResourceKind::SurveyArea,
    collection: "SurveyArea",
    segment: "surveyarea",
    singular: "survey area",
    plural: "survey areas",
    tag: "Survey Areas",
    schema: Schema {
        attributes: &[
            AttrRule::required("name", AttrType::String),
            AttrRule::optional("description", AttrType::String),
            AttrRule::optional("region", AttrType::String),
            AttrRule::optional("geometry", AttrType::Object),
        ],
        edge: false,
    },
};

pub static DATASET: ResourceSpec = ResourceSpec {
    kind: ResourceKind::Dataset,
    collection: "Dataset",
    segment: "dataset",
    singular: "dataset",
    plural: "datasets",
    tag: "Datasets",
    schema: Schema {
        attributes: &[
            AttrRule::required("name", AttrType::String),
            AttrRule::optional("description", AttrType::String),
            AttrRule::optional("format", AttrType::String),
            AttrRule::optional("tags", AttrType::Array),
        ],
        edge: false,
    },
};

pub static DATAFILE: ResourceSpec = ResourceSpec {
    kind: ResourceKind::Datafile,
    collection: "Datafile",
    segment: "datafile",
    singular: "datafile",
    plural: "datafiles",
    tag: "Datafiles",
    schema: Schema {
        attributes: &[
            AttrRule::required("name", AttrType::String),
            AttrRule::optional("uri", AttrType::String),
            AttrRule::optional("media_type", AttrType::String),
            AttrRule::optional("size_bytes", AttrType::Integer),
            AttrRule::optional("checksum", AttrType::String),
        ],
        edge: false,
    },
};

pub static CONTAINS: ResourceSpec = ResourceSpec {
    kind: ResourceKind::Contains,
    collection: "contains",
    segment: "contains",
    singular: "contains relationship",
    plural: "contains relationships",
    tag: "Contains",
    schema: Schema {
        attributes: &[AttrRule::optional("description", AttrType::String)],
        edge: true,
    },
};

pub static PRODUCES: ResourceSpec = ResourceSpec {
    kind: ResourceKind::Produces,
    collection: "produces",
    segment: "produces",
    singular: "produces relationship",
    plural: "produces relationships",
    tag: "Produces",
    schema: Schema {
        attributes: &[
            AttrRule::optional("description", AttrType::String),
            AttrRule::optional("process", AttrType::String),
        ],
        edge: true,
    },
};
