/// Markdown report for a finished run.
///
/// Rendering is a pure function of the settings, the run result and the
/// classifier. The only timestamp in the output is the one stored in the run,
/// so identical inputs give byte-identical reports.
use crate::aggregate::top_n;
use crate::classifier::{Classification, Classifier};
use crate::config::Settings;
use crate::model::{Category, FetchOutcome, FrequencyResult, QueryFailure, RunResult};

const SUMMARY_TOP: usize = 10;
const TABLE_HEADER: &str = "| № | Фраза | Частотность | Тип |\n|---|-------|-------------|-----|\n";
const SEPARATOR: &str = "---\n\n";

pub fn render_report(settings: &Settings, run: &RunResult, classifier: &Classifier) -> String {
    let mut out = String::new();

    out.push_str("# Результаты парсинга Яндекс Вордстат\n\n");
    out.push_str(&format!(
        "**Дата:** {}\n",
        run.started_at.format("%d.%m.%Y %H:%M")
    ));
    out.push_str(&format!(
        "**Регион:** {} ({})\n",
        settings.city, settings.region_code
    ));
    out.push_str(&format!("**Устройства:** {}\n", settings.devices.join(", ")));
    out.push_str(&format!(
        "**Запросов:** {} (успешно: {}, без данных: {})\n\n",
        run.queries.len(),
        run.success_count(),
        run.failure_count()
    ));
    out.push_str(SEPARATOR);

    for (idx, query) in run.queries.iter().enumerate() {
        out.push_str(&format!("## {}. {}\n\n", idx + 1, query.query));
        match &query.outcome {
            FetchOutcome::Success(result) => {
                render_result(&mut out, settings, run, classifier, result)
            }
            FetchOutcome::Failure(failure) => render_failure(&mut out, failure),
        }
        out.push_str(SEPARATOR);
    }

    render_summary(&mut out, settings, run, classifier);
    out
}

fn render_result(
    out: &mut String,
    settings: &Settings,
    run: &RunResult,
    classifier: &Classifier,
    result: &FrequencyResult,
) {
    out.push_str(&format!(
        "**Общая частотность:** {}\n\n",
        format_number(result.total_count)
    ));

    if result.related.is_empty() {
        out.push_str("_Связанных фраз нет._\n\n");
        return;
    }

    out.push_str(TABLE_HEADER);
    for (rank, entry) in result
        .ranked()
        .into_iter()
        .take(settings.results_limit)
        .enumerate()
    {
        let classification = classifier.classify(&entry.phrase, &settings.city);
        let mut phrase = escape_cell(&entry.phrase);
        if run.index.is_duplicate(&entry.phrase) {
            phrase.push_str(&format!(
                " *(встречается в {} запросах)*",
                run.index.occurrences(&entry.phrase)
            ));
        }
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            rank + 1,
            phrase,
            format_number(entry.count),
            label(classification)
        ));
    }
    out.push('\n');
}

fn render_failure(out: &mut String, failure: &QueryFailure) {
    let reason = if failure.exhausted {
        "попытки исчерпаны"
    } else {
        "запрос отклонён"
    };
    out.push_str(&format!(
        "⚠️ **Нет данных** ({reason}, попыток: {}).\n\n",
        failure.attempts
    ));
    out.push_str(&format!("Последняя ошибка: `{}`\n\n", failure.last_error));
}

fn render_summary(out: &mut String, settings: &Settings, run: &RunResult, classifier: &Classifier) {
    let duplicates = run.index.duplicates();

    out.push_str("## 📊 Сводка\n\n");
    out.push_str(&format!(
        "**Успешных запросов:** {} из {}\n",
        run.success_count(),
        run.queries.len()
    ));
    out.push_str(&format!("**Уникальных фраз:** {}\n", format_number(run.index.len() as u64)));
    out.push_str(&format!("**Повторяющихся фраз:** {}\n\n", duplicates.len()));

    out.push_str(&format!("### Топ-{SUMMARY_TOP} фраз\n\n"));
    let top = top_n(run.results(), SUMMARY_TOP);
    if top.is_empty() {
        out.push_str("_Нет данных._\n\n");
    } else {
        out.push_str(TABLE_HEADER);
        for (rank, entry) in top.iter().enumerate() {
            let classification = classifier.classify(&entry.phrase, &settings.city);
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                rank + 1,
                escape_cell(&entry.phrase),
                format_number(entry.count),
                label(classification)
            ));
        }
        out.push('\n');
    }

    if !duplicates.is_empty() {
        out.push_str("### Повторяющиеся фразы\n\n");
        for duplicate in &duplicates {
            let positions: Vec<String> = run
                .index
                .queries_for(&duplicate.phrase)
                .iter()
                .map(|id| (id + 1).to_string())
                .collect();
            out.push_str(&format!(
                "- {}: встречается в {} запросах (№ {})\n",
                duplicate.phrase,
                duplicate.occurrences,
                positions.join(", ")
            ));
        }
        out.push('\n');
    }
}

/// Category marker for a table row, e.g. "📍🛒 Коммерческий (локальный)".
pub fn label(classification: Classification) -> String {
    let category = classification.category;
    match (classification.local, category) {
        (true, Category::Other) => "📍 Локальный".to_string(),
        (true, _) => format!("📍{} {} (локальный)", category.emoji(), category.title()),
        (false, _) => format!("{} {}", category.emoji(), category.title()),
    }
}

/// Format an integer with a space as the thousands separator: 1520 → "1 520".
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
