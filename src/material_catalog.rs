use crate::config::DEFAULT_CATALOG_PATH;
use crate::error::{MixError, Result};
use crate::grading::{Grading, GradingType};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Read-only source of material properties, looked up by name.
pub trait MaterialCatalog {
    /// Grading text in the sieve-row format
    fn grading(&self, name: &str) -> Result<String>;
    fn grading_max_diameter(&self, name: &str) -> Result<f64>;
    fn grading_type(&self, name: &str) -> Result<GradingType>;
    fn aggregate_specific_gravity(&self, display_name: &str) -> Result<f64>;
    /// Clinker phase-fraction record of a cement
    fn pfc(&self, cement_name: &str) -> Result<String>;
    /// [dihydrate, hemihydrate, anhydrite] mass fractions within the cement
    fn sulfate_fractions(&self, cement_name: &str) -> Result<[f64; 3]>;
    fn fly_ash_specific_gravity(&self, sample: &str) -> Result<f64>;
    fn slag_specific_gravity(&self, sample: &str) -> Result<f64>;
    fn inert_filler_specific_gravity(&self, sample: &str) -> Result<f64>;
}

/// Write side for gradings: create-once, keyed by name.
pub trait GradingStore {
    /// Fails with `DuplicateGrading` if the name is taken; the stored record is left as is.
    fn save_grading(&self, grading: &Grading) -> Result<()>;
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SulfateRecord {
    #[serde(default)]
    pub dihydrate: f64,
    #[serde(default)]
    pub hemihydrate: f64,
    #[serde(default)]
    pub anhydrite: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CementRecord {
    pub pfc: String,
    #[serde(default)]
    pub sulfates: SulfateRecord,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub specific_gravity: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradingRecord {
    #[serde(rename = "type")]
    pub kind: GradingType,
    pub max_diameter: f64,
    pub text: String,
}

/// On-disk layout of the catalog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogDocument {
    pub cements: HashMap<String, CementRecord>,
    pub aggregates: HashMap<String, SampleRecord>,
    pub gradings: HashMap<String, GradingRecord>,
    pub fly_ash: HashMap<String, SampleRecord>,
    pub slag: HashMap<String, SampleRecord>,
    pub inert_filler: HashMap<String, SampleRecord>,
}

/// Parsed documents, keyed by file path or caller-supplied key
static DOCUMENT_CACHE: Lazy<Mutex<HashMap<String, Arc<CatalogDocument>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn cached_document(
    key: &str,
    load: impl FnOnce() -> Result<String>,
) -> Result<Arc<CatalogDocument>> {
    if let Some(doc) = lock(&*DOCUMENT_CACHE).get(key) {
        return Ok(Arc::clone(doc));
    }

    let doc: CatalogDocument = serde_json::from_str(&load()?)?;
    let doc = Arc::new(doc);
    lock(&*DOCUMENT_CACHE).insert(key.to_string(), Arc::clone(&doc));
    debug!(key, "Catalog document parsed");
    Ok(doc)
}

fn positive_sg(component: &str, sg: f64) -> Result<f64> {
    if sg > 0.0 && sg.is_finite() {
        Ok(sg)
    } else {
        Err(MixError::invalid_sg(component, sg))
    }
}

/// Catalog backed by a JSON document; also stores newly saved gradings.
pub struct JsonMaterialCatalog {
    document: Arc<CatalogDocument>,
    gradings: Mutex<HashMap<String, GradingRecord>>,
}

impl JsonMaterialCatalog {
    pub fn new(document: CatalogDocument) -> Self {
        Self::from_shared(Arc::new(document))
    }

    fn from_shared(document: Arc<CatalogDocument>) -> Self {
        let gradings = Mutex::new(document.gradings.clone());
        JsonMaterialCatalog { document, gradings }
    }

    /// Load from a file, reusing a previous parse of the same path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let key = path.display().to_string();
        let doc = cached_document(&key, || Ok(fs::read_to_string(path)?))?;
        Ok(Self::from_shared(doc))
    }

    pub fn load_default() -> Result<Self> {
        Self::load(DEFAULT_CATALOG_PATH.as_path())
    }

    /// Load from an embedded string, cached under `key`.
    pub fn load_str(key: &str, json: &str) -> Result<Self> {
        let doc = cached_document(key, || Ok(json.to_string()))?;
        Ok(Self::from_shared(doc))
    }

    pub fn clear_cache() {
        lock(&*DOCUMENT_CACHE).clear();
    }

    pub fn cache_size() -> usize {
        lock(&*DOCUMENT_CACHE).len()
    }

    /// Current document including gradings saved through this catalog.
    pub fn snapshot(&self) -> CatalogDocument {
        let mut doc = (*self.document).clone();
        doc.gradings = lock(&self.gradings).clone();
        doc
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    fn grading_record(&self, name: &str) -> Result<GradingRecord> {
        lock(&self.gradings)
            .get(name)
            .cloned()
            .ok_or_else(|| MixError::missing("grading", name))
    }

    fn sample_sg(
        table: &HashMap<String, SampleRecord>,
        kind: &'static str,
        name: &str,
    ) -> Result<f64> {
        let record = table.get(name).ok_or_else(|| MixError::missing(kind, name))?;
        positive_sg(name, record.specific_gravity)
    }

    fn cement(&self, name: &str) -> Result<&CementRecord> {
        self.document
            .cements
            .get(name)
            .ok_or_else(|| MixError::missing("cement", name))
    }
}

impl MaterialCatalog for JsonMaterialCatalog {
    fn grading(&self, name: &str) -> Result<String> {
        Ok(self.grading_record(name)?.text)
    }

    fn grading_max_diameter(&self, name: &str) -> Result<f64> {
        Ok(self.grading_record(name)?.max_diameter)
    }

    fn grading_type(&self, name: &str) -> Result<GradingType> {
        Ok(self.grading_record(name)?.kind)
    }

    fn aggregate_specific_gravity(&self, display_name: &str) -> Result<f64> {
        Self::sample_sg(&self.document.aggregates, "aggregate", display_name)
    }

    fn pfc(&self, cement_name: &str) -> Result<String> {
        Ok(self.cement(cement_name)?.pfc.clone())
    }

    fn sulfate_fractions(&self, cement_name: &str) -> Result<[f64; 3]> {
        let s = &self.cement(cement_name)?.sulfates;
        Ok([s.dihydrate, s.hemihydrate, s.anhydrite])
    }

    fn fly_ash_specific_gravity(&self, sample: &str) -> Result<f64> {
        Self::sample_sg(&self.document.fly_ash, "fly ash sample", sample)
    }

    fn slag_specific_gravity(&self, sample: &str) -> Result<f64> {
        Self::sample_sg(&self.document.slag, "slag sample", sample)
    }

    fn inert_filler_specific_gravity(&self, sample: &str) -> Result<f64> {
        Self::sample_sg(&self.document.inert_filler, "inert filler sample", sample)
    }
}

impl GradingStore for JsonMaterialCatalog {
    fn save_grading(&self, grading: &Grading) -> Result<()> {
        match lock(&self.gradings).entry(grading.name.clone()) {
            Entry::Occupied(_) => Err(MixError::DuplicateGrading(grading.name.clone())),
            Entry::Vacant(slot) => {
                slot.insert(GradingRecord {
                    kind: grading.kind,
                    max_diameter: grading.max_diameter,
                    text: grading.to_text(),
                });
                Ok(())
            }
        }
    }
}
