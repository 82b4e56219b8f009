use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

const GROUPS: [&str; 3] = ["Dirigenti", "Preposti", "Lavoratori"];
const LANGUAGES: [&str; 2] = ["it", "en"];
const SEXES: [&str; 2] = ["F", "M"];
const COUNTRIES: [&str; 3] = ["Italia", "Spagna", "Romania"];
const WORKPLACES: [&str; 2] = ["Ufficio", "Cantiere"];
const COMPETENCIES: [&str; 6] = [
    "Ascolto",
    "Comunicazione",
    "Coerenza",
    "Esempio",
    "Coinvolgimento",
    "Riconoscimento",
];
const QUALITIES: [&str; 12] = [
    "ascolto",
    "coerenza",
    "empatia",
    "competenza",
    "onestà",
    "presenza",
    "rispetto",
    "chiarezza",
    "fermezza",
    "disponibilità",
    "esempio",
    "fiducia",
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len())]
    }

    /// True with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

struct Response {
    group: &'static str,
    language: &'static str,
    birth_date: Option<String>,
    sex: Option<&'static str>,
    country: &'static str,
    work_place: &'static str,
    scores: Vec<Option<i64>>,
}

fn generate_responses(rng: &mut SimpleRng, n: usize) -> Vec<Response> {
    (0..n)
        .map(|_| {
            let work_place = rng.pick(&WORKPLACES);
            // Site staff score higher on presence-type competencies.
            let bias = if work_place == "Cantiere" { 8.0 } else { -4.0 };
            let birth_date = if rng.chance(0.04) {
                Some("non indicata".to_string())
            } else if rng.chance(0.02) {
                None
            } else {
                let year = 1958 + rng.below(45);
                let month = 1 + rng.below(12);
                let day = 1 + rng.below(28);
                Some(format!("{year}-{month:02}-{day:02}"))
            };
            let scores = COMPETENCIES
                .iter()
                .enumerate()
                .map(|(i, _)| {
                    if rng.chance(0.03) {
                        None
                    } else {
                        let base = 55.0 + 5.0 * i as f64 + bias * (i % 2) as f64;
                        let noise = (rng.next_f64() - 0.5) * 40.0;
                        Some((base + noise).clamp(0.0, 100.0).round() as i64)
                    }
                })
                .collect();
            Response {
                group: rng.pick(&GROUPS),
                language: rng.pick(&LANGUAGES),
                birth_date,
                sex: if rng.chance(0.03) { None } else { Some(rng.pick(&SEXES)) },
                country: rng.pick(&COUNTRIES),
                work_place,
                scores,
            }
        })
        .collect()
}

fn write_responses_csv(path: &str, responses: &[Response]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    let mut header = vec!["group", "language", "birth_date", "sex", "country", "work_place"];
    header.extend(COMPETENCIES);
    writer.write_record(&header)?;

    for r in responses {
        let mut record = vec![
            r.group.to_string(),
            r.language.to_string(),
            r.birth_date.clone().unwrap_or_default(),
            r.sex.unwrap_or_default().to_string(),
            r.country.to_string(),
            r.work_place.to_string(),
        ];
        record.extend(
            r.scores
                .iter()
                .map(|s| s.map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_responses_parquet(path: &str, responses: &[Response]) -> Result<()> {
    let mut fields = vec![
        Field::new("group", DataType::Utf8, false),
        Field::new("language", DataType::Utf8, false),
        Field::new("birth_date", DataType::Utf8, true),
        Field::new("sex", DataType::Utf8, true),
        Field::new("country", DataType::Utf8, false),
        Field::new("work_place", DataType::Utf8, false),
    ];
    fields.extend(
        COMPETENCIES
            .iter()
            .map(|c| Field::new(*c, DataType::Int64, true)),
    );
    let schema = Arc::new(Schema::new(fields));

    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(
            responses.iter().map(|r| r.group).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            responses.iter().map(|r| r.language).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            responses
                .iter()
                .map(|r| r.birth_date.as_deref())
                .collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            responses.iter().map(|r| r.sex).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            responses.iter().map(|r| r.country).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            responses.iter().map(|r| r.work_place).collect::<Vec<_>>(),
        )),
    ];
    for i in 0..COMPETENCIES.len() {
        columns.push(Arc::new(Int64Array::from(
            responses.iter().map(|r| r.scores[i]).collect::<Vec<_>>(),
        )));
    }

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QualityAnswer {
    id: usize,
    main_workplace: Option<&'static str>,
    country: &'static str,
    gender: &'static str,
    qualities: Vec<&'static str>,
}

fn generate_qualities(rng: &mut SimpleRng, n: usize) -> Vec<QualityAnswer> {
    (1..=n)
        .map(|id| {
            let main_workplace = if rng.chance(0.03) { None } else { Some(rng.pick(&WORKPLACES)) };
            // Skewed towards the first qualities so rankings are not flat.
            let n_selected = if rng.chance(0.05) { 0 } else { 1 + rng.below(5) };
            let mut qualities: Vec<&'static str> = Vec::with_capacity(n_selected);
            while qualities.len() < n_selected {
                let idx = rng.below(QUALITIES.len()).min(rng.below(QUALITIES.len()));
                if !qualities.contains(&QUALITIES[idx]) {
                    qualities.push(QUALITIES[idx]);
                }
            }
            QualityAnswer {
                id,
                main_workplace,
                country: rng.pick(&COUNTRIES),
                gender: rng.pick(&SEXES),
                qualities,
            }
        })
        .collect()
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let responses = generate_responses(&mut rng, 400);
    write_responses_csv("reporte_para_dashboard.csv", &responses)?;
    write_responses_parquet("reporte_para_dashboard.parquet", &responses)?;

    let answers = generate_qualities(&mut rng, 250);
    let json = serde_json::to_string_pretty(&answers).context("serializing qualities")?;
    std::fs::write("qualities_survey.json", json).context("writing qualities_survey.json")?;

    let selections: usize = answers.iter().map(|a| a.qualities.len()).sum();
    println!(
        "Wrote {} responses ({} competencies) and {} quality answers ({selections} selections)",
        responses.len(),
        COMPETENCIES.len(),
        answers.len()
    );
    Ok(())
}
