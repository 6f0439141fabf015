/// Flat CSV export: one row per related phrase of every successful query.
use crate::classifier::Classifier;
use crate::config::Settings;
use crate::model::RunResult;

const CSV_HEADER: &str = "query,phrase,count,category,local,occurrences\n";

pub fn export_csv(settings: &Settings, run: &RunResult, classifier: &Classifier) -> String {
    let mut out = String::from(CSV_HEADER);
    for query in &run.queries {
        let Some(result) = query.outcome.result() else {
            continue;
        };
        for entry in result.ranked() {
            let classification = classifier.classify(&entry.phrase, &settings.city);
            let row = [
                csv_field(&query.query),
                csv_field(&entry.phrase),
                entry.count.to_string(),
                classification.category.as_str().to_string(),
                classification.local.to_string(),
                run.index.occurrences(&entry.phrase).to_string(),
            ];
            out.push_str(&row.join(","));
            out.push('\n');
        }
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
