use anyhow::{Result, bail};
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};
use survey_core::{
    Catalog, Draft, EntryVariant, FlatRecord, FlowError, FlowState, FormSnapshot,
    KeyValueStore, MAX_SUBMISSIONS, MemoryStore, Review, SqliteStore, Step, StepFlowController,
    Submission, SubmissionStore, SurveyConfig, Transition, ValidationResult, flatten_report,
    progress,
};

use crate::answers::Answers;

pub fn schema_export(out_dir: PathBuf) -> Result<()> {
    fs::create_dir_all(&out_dir)?;

    let submission_schema = schema_for!(Submission);
    let submission_json = serde_json::to_string_pretty(&submission_schema)?;
    fs::write(out_dir.join("Submission.schema.json"), submission_json)?;

    let row_schema = schema_for!(FlatRecord);
    let row_json = serde_json::to_string_pretty(&row_schema)?;
    fs::write(out_dir.join("FlatRecord.schema.json"), row_json)?;

    println!("Exported schemas to {}", out_dir.display());
    Ok(())
}

pub fn catalog(config: &SurveyConfig, sector: Option<&str>, village: Option<&str>) -> Result<()> {
    let catalog = Catalog::load(&config.catalog)?;
    let choices: Vec<&str> = match (sector, village) {
        (None, _) => catalog.sectors(),
        (Some(sector), None) => catalog.villages(sector),
        (Some(sector), Some(village)) => catalog
            .property_numbers(sector, village)
            .iter()
            .map(String::as_str)
            .collect(),
    };
    if choices.is_empty() {
        println!("No choices available.");
    }
    for choice in choices {
        println!("{choice}");
    }
    Ok(())
}

pub fn fill(
    config: &SurveyConfig,
    answers: Option<&Path>,
    resume: bool,
    dry_run: bool,
) -> Result<()> {
    let catalog = Catalog::load(&config.catalog)?;
    let flow = StepFlowController::new(&catalog);
    let (state, form) = starting_point(config, &flow, answers, resume)?;

    if dry_run {
        let mut store = SubmissionStore::open(MemoryStore::default())?;
        walk(&flow, state, &form, &mut store)
    } else {
        let mut store = open_store(config)?;
        walk(&flow, state, &form, &mut store)
    }
}

/// A fresh session from the answers file, or the saved draft's position
/// with either the corrected answers or the draft's own values.
fn starting_point(
    config: &SurveyConfig,
    flow: &StepFlowController<'_>,
    answers: Option<&Path>,
    resume: bool,
) -> Result<(FlowState, FormSnapshot)> {
    let answers = answers.map(Answers::load).transpose()?;
    if !resume {
        let Some(answers) = answers else {
            bail!("an answers file is required unless resuming a draft");
        };
        let state = flow.select_variant(&FlowState::new(), answers.entry)?;
        return Ok((state, answers.into_form()));
    }

    let Some(draft) = open_store(config)?.load_draft()? else {
        bail!("no draft saved to resume");
    };
    println!("Resuming the draft at step {}.", draft.flow.step());
    match answers {
        None => Ok((draft.flow, draft.form)),
        Some(answers) => {
            let state = flow.select_variant(&draft.flow, answers.entry)?;
            Ok((state, answers.into_form()))
        }
    }
}

/// Advance step by step until review, then confirm. Every step reached is
/// saved as the draft; a failing step leaves the draft where it stopped.
fn walk<S: KeyValueStore>(
    flow: &StepFlowController<'_>,
    mut state: FlowState,
    form: &FormSnapshot,
    store: &mut SubmissionStore<S>,
) -> Result<()> {
    // the review is rebuilt by stepping into it again
    if state.step() == Step::Review {
        state = flow.back(&state)?;
    }
    loop {
        println!("[{}] {}", state.step(), progress(&state));
        let review = match flow.next(&state, form) {
            Ok(Transition { state: next, review }) => {
                state = next;
                review
            }
            Err(err) => return stop(store, state, form, err),
        };
        store.save_draft(&Draft {
            flow: state,
            form: form.clone(),
        })?;
        let Some(review) = review else {
            continue;
        };

        println!("[{}] {}", state.step(), progress(&state));
        print_review(&review);
        return match flow.submit(&state, review, store) {
            Ok(receipt) => {
                println!("[{}] {}", receipt.state.step(), progress(&receipt.state));
                println!(
                    "Registered as {}. {} of {MAX_SUBMISSIONS} slots used.",
                    receipt.key,
                    store.count()
                );
                if !receipt.draft_cleared {
                    println!("The saved draft could not be removed; run `draft clear`.");
                }
                Ok(())
            }
            Err(err) => stop(store, state, form, err),
        };
    }
}

fn stop<S: KeyValueStore>(
    store: &mut SubmissionStore<S>,
    state: FlowState,
    form: &FormSnapshot,
    err: FlowError,
) -> Result<()> {
    println!("{}", err.user_message());
    if let FlowError::Invalid { result, .. } = &err {
        print_field_errors(result);
    }
    store.save_draft(&Draft {
        flow: state,
        form: form.clone(),
    })?;
    println!("The form was kept as a draft at step {}.", state.step());
    Err(err.into())
}

fn print_field_errors(result: &ValidationResult) {
    for (field, message) in &result.field_errors {
        println!("  {field}: {message}");
    }
}

fn print_review(review: &Review) {
    let location = &review.location;
    println!(
        "  {} / {} / property {}",
        location.sector, location.village, location.property_number
    );
    println!(
        "  {} floors, {} {}",
        review.unit.total_floors, review.unit.building_type, review.unit.section_type
    );
    match &review.entry {
        EntryVariant::Single { .. } => println!("  entry: single"),
        EntryVariant::MyFloors { floors, .. } => {
            println!("  entry: my floors ({} floors)", floors.len())
        }
        EntryVariant::FullBuilding { residents, .. } => {
            println!("  entry: full building ({} residents)", residents.len())
        }
    }
}

pub fn draft_show(config: &SurveyConfig) -> Result<()> {
    let store = open_store(config)?;
    match store.load_draft()? {
        None => println!("No draft saved."),
        Some(draft) => {
            println!(
                "Draft at step {} ({}), {}",
                draft.flow.step(),
                draft.flow.variant().label(),
                progress(&draft.flow)
            );
            println!("{}", serde_json::to_string_pretty(&draft.form)?);
        }
    }
    Ok(())
}

pub fn draft_clear(config: &SurveyConfig) -> Result<()> {
    let mut store = open_store(config)?;
    store.clear_draft()?;
    println!("Draft cleared.");
    Ok(())
}

pub fn status(config: &SurveyConfig) -> Result<()> {
    let store = open_store(config)?;
    println!(
        "{} of {MAX_SUBMISSIONS} submissions stored, {} remaining.",
        store.count(),
        store.remaining()
    );
    for key in store.keys() {
        println!("  {key}");
    }
    if let Some(draft) = store.load_draft()? {
        let step = draft.flow.step();
        if step != Step::Submitted {
            println!("A draft is waiting at step {step}.");
        }
    }
    Ok(())
}

pub fn export(config: &SurveyConfig, out_dir: Option<PathBuf>, title: Option<String>) -> Result<()> {
    let store = open_store(config)?;
    let report = store.all()?;
    let (rows, summary) = match flatten_report(&report) {
        Ok(flattened) => flattened,
        Err(err) => {
            println!("{}", err.user_message());
            return Ok(());
        }
    };

    let out_dir = out_dir.unwrap_or_else(|| config.export.dir.clone());
    let title = title.unwrap_or_else(|| config.export.title.clone());
    if title.trim().is_empty() {
        bail!("export title must not be empty");
    }
    let path = sheet::write_sheet(&rows, &title, &out_dir)?;

    println!(
        "Wrote {} rows from {} submissions to {}",
        summary.rows,
        summary.submissions,
        path.display()
    );
    if summary.skipped > 0 {
        println!("Skipped {} unreadable records.", summary.skipped);
    }
    Ok(())
}

fn open_store(config: &SurveyConfig) -> Result<SubmissionStore<SqliteStore>> {
    let backend = SqliteStore::open(&config.database)?;
    Ok(SubmissionStore::open(backend)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CATALOG: &str = r#"
sectors:
  Tyre:
    villages:
      Qana: ["101", "102"]
"#;

    const SINGLE: &str = r#"
entry = "single"
sector = "Tyre"
village = "Qana"
neighborhood = "Al Madares"
buildingName = "Haidar Building"
street = "Main Street"
propertyNumber = "101"
sectionNumber = "4"
buildingType = "residential"
totalFloors = "5"
floorNumber = "2"
sectionType = "house"
direction = "north"
fullName = "Ali Hassan Khalil"
motherName = "Zeinab"
registry = "114"
phone = "70 123 456"
"#;

    fn settings(dir: &Path) -> SurveyConfig {
        let catalog = dir.join("catalog.yaml");
        fs::write(&catalog, CATALOG).unwrap();
        SurveyConfig {
            database: dir.join("survey.db"),
            catalog,
            ..SurveyConfig::default()
        }
    }

    #[test]
    fn fill_then_export_writes_a_sheet() {
        let dir = tempdir().unwrap();
        let config = settings(dir.path());
        let answers = dir.path().join("answers.toml");
        fs::write(&answers, SINGLE).unwrap();

        fill(&config, Some(&answers), false, false).unwrap();
        assert_eq!(open_store(&config).unwrap().count(), 1);

        let out = dir.path().join("out");
        export(&config, Some(out.clone()), Some("south".into())).unwrap();
        let written: Vec<_> = fs::read_dir(&out).unwrap().collect();
        assert_eq!(written.len(), 1);
    }

    #[test]
    fn dry_run_stores_nothing() {
        let dir = tempdir().unwrap();
        let config = settings(dir.path());
        let answers = dir.path().join("answers.toml");
        fs::write(&answers, SINGLE).unwrap();

        fill(&config, Some(&answers), false, true).unwrap();
        assert_eq!(open_store(&config).unwrap().count(), 0);
    }

    #[test]
    fn failing_step_keeps_a_draft() {
        let dir = tempdir().unwrap();
        let config = settings(dir.path());
        let answers = dir.path().join("answers.toml");
        fs::write(&answers, SINGLE.replace("70 123 456", "12")).unwrap();

        assert!(fill(&config, Some(&answers), false, false).is_err());
        let draft = open_store(&config).unwrap().load_draft().unwrap().unwrap();
        assert_eq!(draft.flow.step(), Step::Contact);
        assert_eq!(draft.form.phone, "12");
    }

    #[test]
    fn corrected_answers_resume_the_draft() {
        let dir = tempdir().unwrap();
        let config = settings(dir.path());
        let answers = dir.path().join("answers.toml");
        fs::write(&answers, SINGLE.replace("70 123 456", "12")).unwrap();
        assert!(fill(&config, Some(&answers), false, false).is_err());

        fs::write(&answers, SINGLE).unwrap();
        fill(&config, Some(&answers), true, false).unwrap();

        let store = open_store(&config).unwrap();
        assert_eq!(store.count(), 1);
        assert_eq!(store.load_draft().unwrap(), None);
    }

    #[test]
    fn resume_without_a_draft_is_refused() {
        let dir = tempdir().unwrap();
        let config = settings(dir.path());
        assert!(fill(&config, None, true, false).is_err());
        assert!(fill(&config, None, false, false).is_err());
    }

    #[test]
    fn dry_run_does_not_touch_the_saved_draft() {
        let dir = tempdir().unwrap();
        let config = settings(dir.path());
        let answers = dir.path().join("answers.toml");
        fs::write(&answers, SINGLE.replace("70 123 456", "12")).unwrap();
        assert!(fill(&config, Some(&answers), false, false).is_err());

        fs::write(&answers, SINGLE).unwrap();
        fill(&config, Some(&answers), true, true).unwrap();
        let draft = open_store(&config).unwrap().load_draft().unwrap().unwrap();
        assert_eq!(draft.flow.step(), Step::Contact);
    }

    #[test]
    fn export_without_submissions_writes_nothing() {
        let dir = tempdir().unwrap();
        let config = settings(dir.path());
        let out = dir.path().join("out");
        export(&config, Some(out.clone()), None).unwrap();
        assert!(!out.exists());
    }
}
