//! Built-in knowledge base.
//!
//! Compiled-in defaults so the engine runs without any external files.
//! Disease/test parameters follow published point estimates for the
//! common assays (NS1 antigen, blood smear, RT-PCR, ...); epidemiology
//! entries encode coarse regional season windows, not granular incidence.

use crate::catalog::{
    Disease, DiagnosticTest, ImagingLabel, KnowledgeBase, Medication, SeasonalModifier,
    TreatmentProtocol, VariantRisk,
};
use ddx_common::{DiseaseId, Region, TestId, SCHEMA_VERSION};

fn disease(id: &str, name: &str, category: &str, symptoms: &[&str], hereditary: &[&str]) -> Disease {
    Disease {
        id: DiseaseId::from(id),
        name: name.to_string(),
        category: category.to_string(),
        symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
        hereditary_terms: hereditary.iter().map(|s| s.to_string()).collect(),
    }
}

fn test(id: &str, name: &str, disease: &str, cost: f64, se: f64, sp: f64) -> DiagnosticTest {
    DiagnosticTest {
        id: TestId::from(id),
        name: name.to_string(),
        disease_id: DiseaseId::from(disease),
        cost,
        sensitivity: se,
        specificity: sp,
    }
}

fn seasonal(disease: &str, region: Region, months: &[u8], multiplier: f64) -> SeasonalModifier {
    SeasonalModifier {
        disease_id: DiseaseId::from(disease),
        region,
        months: months.to_vec(),
        multiplier,
    }
}

fn variant(code: &str, disease: &str, multiplier: f64) -> VariantRisk {
    VariantRisk {
        variant: code.to_string(),
        disease_id: DiseaseId::from(disease),
        multiplier,
    }
}

fn label(name: &str, disease: &str) -> ImagingLabel {
    ImagingLabel {
        label: name.to_string(),
        disease_id: DiseaseId::from(disease),
    }
}

fn med(name: &str, dosage: &str, duration: Option<&str>, contra: &[&str]) -> Medication {
    Medication {
        name: name.to_string(),
        dosage: dosage.to_string(),
        duration: duration.map(|d| d.to_string()),
        contraindications: contra.iter().map(|c| c.to_string()).collect(),
    }
}

fn protocol(
    disease: &str,
    medications: Vec<Medication>,
    lifestyle: &[&str],
    follow_up: &str,
) -> TreatmentProtocol {
    TreatmentProtocol {
        disease_id: DiseaseId::from(disease),
        medications,
        lifestyle: lifestyle.iter().map(|s| s.to_string()).collect(),
        follow_up: follow_up.to_string(),
    }
}

/// Canonical symptom vocabulary.
const VOCABULARY: &[&str] = &[
    "fever",
    "headache",
    "cough",
    "fatigue",
    "joint_pain",
    "rash",
    "nausea",
    "vomiting",
    "diarrhea",
    "chills",
    "sweating",
    "chest_pain",
    "shortness_of_breath",
    "body_aches",
    "sore_throat",
    "runny_nose",
    "muscle_pain",
    "weakness",
    "appetite_loss",
    "weight_loss",
    "night_sweats",
    "abdominal_pain",
    "bleeding",
    "bruising",
    "eye_pain",
    "skin_rash",
];

/// Construct the built-in knowledge base.
pub fn builtin() -> KnowledgeBase {
    KnowledgeBase {
        schema_version: SCHEMA_VERSION.to_string(),
        description: Some("Built-in DDX knowledge base".to_string()),
        vocabulary: VOCABULARY.iter().map(|s| s.to_string()).collect(),
        diseases: vec![
            disease(
                "D001",
                "Dengue Fever",
                "Infectious",
                &[
                    "fever",
                    "headache",
                    "joint_pain",
                    "muscle_pain",
                    "rash",
                    "eye_pain",
                    "bleeding",
                    "nausea",
                ],
                &["dengue"],
            ),
            disease(
                "D002",
                "Malaria",
                "Infectious",
                &[
                    "fever",
                    "chills",
                    "sweating",
                    "headache",
                    "nausea",
                    "vomiting",
                    "fatigue",
                ],
                &["malaria"],
            ),
            disease(
                "D003",
                "Typhoid Fever",
                "Infectious",
                &[
                    "fever",
                    "abdominal_pain",
                    "headache",
                    "weakness",
                    "diarrhea",
                    "appetite_loss",
                ],
                &["typhoid"],
            ),
            disease(
                "D004",
                "Influenza",
                "Respiratory",
                &[
                    "fever",
                    "cough",
                    "sore_throat",
                    "body_aches",
                    "fatigue",
                    "runny_nose",
                    "headache",
                    "chills",
                ],
                &["influenza", "flu", "asthma"],
            ),
            disease(
                "D005",
                "Pneumonia",
                "Respiratory",
                &[
                    "cough",
                    "fever",
                    "chest_pain",
                    "shortness_of_breath",
                    "fatigue",
                    "sweating",
                ],
                &["pneumonia", "copd", "asthma"],
            ),
            disease(
                "D006",
                "COVID-19",
                "Respiratory",
                &[
                    "fever",
                    "cough",
                    "fatigue",
                    "shortness_of_breath",
                    "sore_throat",
                    "headache",
                    "muscle_pain",
                ],
                &["covid"],
            ),
            disease(
                "D007",
                "Common Cold",
                "Respiratory",
                &["runny_nose", "sore_throat", "cough", "headache"],
                &[],
            ),
            // Imaging-only conditions: no symptom profile, so they can only
            // enter a differential through evidence fusion.
            disease("D101", "Atelectasis", "Respiratory", &[], &[]),
            disease("D102", "Cardiomegaly", "Cardiovascular", &[], &[]),
            disease("D103", "Lung Consolidation", "Respiratory", &[], &[]),
            disease("D104", "Pulmonary Edema", "Cardiovascular", &[], &[]),
            disease("D105", "Pleural Effusion", "Respiratory", &[], &[]),
            disease("D106", "Emphysema", "Respiratory", &[], &[]),
            disease("D107", "Pulmonary Fibrosis", "Respiratory", &[], &[]),
            disease("D108", "Hiatal Hernia", "Gastrointestinal", &[], &[]),
            disease("D109", "Lung Infiltration", "Respiratory", &[], &[]),
            disease("D110", "Lung Mass", "Oncology", &[], &[]),
            disease("D111", "Lung Nodule", "Oncology", &[], &[]),
            disease("D112", "Pleural Thickening", "Respiratory", &[], &[]),
            disease("D113", "Pneumothorax", "Respiratory", &[], &[]),
        ],
        tests: vec![
            test("T001", "NS1 Antigen Test", "D001", 25.0, 0.85, 0.95),
            test("T002", "Dengue IgM/IgG", "D001", 35.0, 0.90, 0.85),
            test("T003", "Platelet Count", "D001", 10.0, 0.75, 0.65),
            test("T004", "Blood Smear", "D002", 15.0, 0.90, 0.98),
            test("T005", "Rapid Malaria Test", "D002", 20.0, 0.85, 0.90),
            test("T006", "Widal Test", "D003", 15.0, 0.70, 0.80),
            test("T007", "Blood Culture", "D003", 50.0, 0.85, 0.98),
            test("T008", "Rapid Flu Test", "D004", 30.0, 0.70, 0.95),
            test("T009", "PCR Respiratory Panel", "D004", 150.0, 0.98, 0.99),
            test("T010", "Chest X-Ray", "D005", 50.0, 0.80, 0.85),
            test("T011", "Sputum Culture", "D005", 40.0, 0.75, 0.95),
            test("T012", "RT-PCR COVID", "D006", 60.0, 0.95, 0.99),
            test("T013", "Rapid Antigen Test", "D006", 20.0, 0.80, 0.97),
            test("T014", "Clinical Exam Only", "D007", 0.0, 0.90, 0.60),
        ],
        epidemiology: vec![
            seasonal("D001", Region::SouthAsia, &[6, 7, 8, 9, 10], 1.8),
            seasonal("D001", Region::SoutheastAsia, &[5, 6, 7, 8, 9, 10, 11], 1.7),
            seasonal("D001", Region::LatinAmerica, &[1, 2, 3, 4, 5], 1.5),
            seasonal("D002", Region::SubSaharanAfrica, &[], 1.9),
            seasonal("D002", Region::SouthAsia, &[7, 8, 9, 10], 1.4),
            seasonal("D003", Region::SouthAsia, &[], 1.4),
            seasonal("D003", Region::SubSaharanAfrica, &[], 1.3),
            seasonal("D004", Region::NorthAmerica, &[11, 12, 1, 2, 3], 1.6),
            seasonal("D004", Region::Europe, &[11, 12, 1, 2, 3], 1.6),
            seasonal("D004", Region::EastAsia, &[12, 1, 2], 1.5),
            seasonal("D005", Region::Global, &[11, 12, 1, 2], 1.2),
            seasonal("D006", Region::Global, &[], 1.1),
            seasonal("D007", Region::Global, &[10, 11, 12, 1, 2, 3], 1.3),
        ],
        genomics: vec![
            // rs334 (sickle-cell trait) is protective against malaria.
            variant("rs334", "D002", 0.5),
            // IFITM3 rs12252 is associated with severe influenza.
            variant("rs12252", "D004", 1.4),
            variant("rs4702", "D006", 1.2),
            variant("rs1800562", "D003", 1.2),
        ],
        imaging_labels: vec![
            label("Atelectasis", "D101"),
            label("Cardiomegaly", "D102"),
            label("Consolidation", "D103"),
            label("Edema", "D104"),
            label("Effusion", "D105"),
            label("Emphysema", "D106"),
            label("Fibrosis", "D107"),
            label("Hernia", "D108"),
            label("Infiltration", "D109"),
            label("Mass", "D110"),
            label("Nodule", "D111"),
            label("Pleural_Thickening", "D112"),
            label("Pneumonia", "D005"),
            label("Pneumothorax", "D113"),
        ],
        treatments: vec![
            protocol(
                "D001",
                vec![
                    med(
                        "Acetaminophen",
                        "500mg every 6 hours",
                        Some("5 days"),
                        &["liver disease", "acetaminophen allergy"],
                    ),
                    med(
                        "Oral Rehydration Solution",
                        "200ml after each loose stool",
                        None,
                        &[],
                    ),
                ],
                &[
                    "Strict bed rest during the febrile phase",
                    "Avoid aspirin and NSAIDs (bleeding risk)",
                    "Monitor for warning signs: persistent vomiting, bleeding gums",
                ],
                "Daily platelet count until recovery; return immediately if bleeding occurs",
            ),
            protocol(
                "D002",
                vec![
                    med(
                        "Artemether-Lumefantrine",
                        "80/480mg twice daily",
                        Some("3 days"),
                        &["first trimester pregnancy"],
                    ),
                    med(
                        "Primaquine",
                        "15mg daily",
                        Some("14 days"),
                        &["g6pd deficiency", "pregnancy"],
                    ),
                ],
                &[
                    "Complete the full course even after fever resolves",
                    "Sleep under an insecticide-treated net",
                ],
                "Repeat blood smear on day 3 and day 28 to confirm parasite clearance",
            ),
            protocol(
                "D003",
                vec![
                    med(
                        "Azithromycin",
                        "500mg once daily",
                        Some("7 days"),
                        &["macrolide allergy"],
                    ),
                    med(
                        "Ceftriaxone",
                        "2g IV once daily",
                        Some("10 days"),
                        &["cephalosporin allergy"],
                    ),
                ],
                &[
                    "Soft, easily digestible diet",
                    "Strict hand hygiene to prevent household spread",
                ],
                "Stool culture after treatment to confirm clearance",
            ),
            protocol(
                "D004",
                vec![
                    med(
                        "Oseltamivir",
                        "75mg twice daily",
                        Some("5 days"),
                        &["severe renal impairment"],
                    ),
                    med(
                        "Paracetamol",
                        "500mg every 6 hours as needed",
                        None,
                        &["liver disease"],
                    ),
                ],
                &["Rest and adequate fluid intake", "Stay home until fever-free for 24 hours"],
                "Return if breathing difficulty or symptoms persist beyond 7 days",
            ),
            protocol(
                "D005",
                vec![
                    med(
                        "Amoxicillin",
                        "1g three times daily",
                        Some("7 days"),
                        &["penicillin allergy"],
                    ),
                    med(
                        "Azithromycin",
                        "500mg once daily",
                        Some("5 days"),
                        &["macrolide allergy"],
                    ),
                ],
                &["Rest with head elevated", "Breathing exercises several times a day"],
                "Follow-up chest X-ray in 6 weeks to confirm resolution",
            ),
            protocol(
                "D006",
                vec![
                    med(
                        "Nirmatrelvir-Ritonavir",
                        "300/100mg twice daily",
                        Some("5 days"),
                        &["severe hepatic impairment", "severe renal impairment"],
                    ),
                    med(
                        "Paracetamol",
                        "500mg every 6 hours as needed",
                        None,
                        &["liver disease"],
                    ),
                ],
                &["Isolate for 5 days from symptom onset", "Monitor oxygen saturation daily"],
                "Seek urgent care if oxygen saturation drops below 94%",
            ),
            protocol(
                "D007",
                vec![
                    med(
                        "Paracetamol",
                        "500mg every 6 hours as needed",
                        None,
                        &["liver disease"],
                    ),
                    med(
                        "Chlorpheniramine",
                        "4mg at night",
                        Some("3 days"),
                        &["narrow-angle glaucoma"],
                    ),
                ],
                &["Warm fluids and rest", "Saline nasal rinses"],
                "No follow-up needed unless symptoms persist beyond 10 days",
            ),
        ],
    }
}
