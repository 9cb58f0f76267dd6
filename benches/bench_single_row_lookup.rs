//! Single-row lookups by primary key: a cached `rusqlite` statement against
//! `SqlTemplate::query_for_object` on the same seeded file.

use std::cell::RefCell;
use std::hint::black_box;
use std::time::{Duration, Instant};

use criterion::{BenchmarkGroup, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use criterion::measurement::WallTime;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rusqlite::Connection;
use sql_template::{SqlTemplate, TemplateOptions, sql_args};
use tempfile::TempDir;
use tokio::runtime::Runtime;

const ROWS: i64 = 1_000;
const LOOKUP_SQL: &str = "SELECT id, name, score, active FROM accounts WHERE id = ?";

sql_template::record! {
    #[derive(Debug)]
    #[allow(dead_code)]
    struct Account {
        id: i64,
        name: String,
        score: f64,
        active: bool,
    }
}

struct Fixture {
    _dir: TempDir,
    path: String,
    ids: Vec<i64>,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lookup.db").to_string_lossy().into_owned();

    let mut conn = Connection::open(&path).expect("open seed connection");
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         CREATE TABLE accounts (
             id INTEGER PRIMARY KEY,
             name TEXT NOT NULL,
             score REAL NOT NULL,
             active INTEGER NOT NULL
         );",
    )
    .expect("create accounts");
    let tx = conn.transaction().expect("seed transaction");
    {
        let mut insert = tx
            .prepare("INSERT INTO accounts VALUES (?1, ?2, ?3, ?4)")
            .expect("prepare insert");
        for id in 1..=ROWS {
            insert
                .execute((id, format!("account-{id}"), id as f64 / 4.0, id % 3 == 0))
                .expect("insert account");
        }
    }
    tx.commit().expect("commit seed");

    let mut ids: Vec<i64> = (1..=ROWS).collect();
    ids.shuffle(&mut ChaCha8Rng::seed_from_u64(42));
    Fixture { _dir: dir, path, ids }
}

fn timed<F: FnMut(i64)>(iters: u64, ids: &[i64], mut lookup: F) -> Duration {
    let start = Instant::now();
    for _ in 0..iters {
        for &id in ids {
            lookup(id);
        }
    }
    start.elapsed()
}

fn bench_raw(group: &mut BenchmarkGroup<'_, WallTime>, fixture: &Fixture) {
    let conn = Connection::open(&fixture.path).expect("open raw connection");
    let stmt = RefCell::new(conn.prepare_cached(LOOKUP_SQL).expect("prepare lookup"));

    group.bench_function(BenchmarkId::new("rusqlite", fixture.ids.len()), |b| {
        b.iter_custom(|iters| {
            timed(iters, &fixture.ids, |id| {
                let account = stmt
                    .borrow_mut()
                    .query_row([id], |row| {
                        Ok(Account {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            score: row.get(2)?,
                            active: row.get(3)?,
                        })
                    })
                    .expect("raw lookup");
                black_box(account);
            })
        });
    });
}

fn bench_template(group: &mut BenchmarkGroup<'_, WallTime>, fixture: &Fixture, runtime: &Runtime) {
    let template = runtime
        .block_on(SqlTemplate::connect(TemplateOptions::new(fixture.path.clone())))
        .expect("connect template");

    group.bench_function(BenchmarkId::new("template", fixture.ids.len()), |b| {
        b.to_async(runtime).iter_custom(|iters| {
            let template = template.clone();
            let ids = fixture.ids.clone();
            async move {
                let start = Instant::now();
                for _ in 0..iters {
                    for &id in &ids {
                        let account: Account = template
                            .query_for_object(LOOKUP_SQL, &sql_args![id])
                            .await
                            .expect("template lookup");
                        black_box(account);
                    }
                }
                start.elapsed()
            }
        });
    });
}

fn single_row_lookup(c: &mut Criterion) {
    let fixture = fixture();
    let runtime = Runtime::new().expect("tokio runtime");

    let mut group = c.benchmark_group("single_row_lookup");
    group.throughput(Throughput::Elements(fixture.ids.len() as u64));
    bench_raw(&mut group, &fixture);
    bench_template(&mut group, &fixture, &runtime);
    group.finish();
}

criterion_group!(benches, single_row_lookup);
criterion_main!(benches);
