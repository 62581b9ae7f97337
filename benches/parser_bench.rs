use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pg_erd::filter::{filter, FilterOptions};
use pg_erd::parser::{split_statements, StatementType};
use pg_erd::render::{render, Layout, Mode, OutputFormat};
use pg_erd::schema::parse;
use std::hint::black_box;

/// A pg_dump-shaped schema: tables, sequences, functions, and trailing ALTERs
fn generate_dump(tables: usize) -> String {
    let mut sql = String::from("SET statement_timeout = 0;\nCREATE SCHEMA app;\n");

    for t in 0..tables {
        sql.push_str(&format!(
            "CREATE TABLE app.table_{t} (\n    id bigint NOT NULL,\n    parent_id bigint,\n    \
             name character varying(255) NOT NULL,\n    price numeric(10,2) DEFAULT 0.00,\n    \
             created_at timestamp without time zone DEFAULT now() NOT NULL,\n    \
             notes text -- free text; may contain anything\n);\n\n"
        ));
        sql.push_str(&format!(
            "CREATE SEQUENCE app.table_{t}_id_seq START WITH 1 INCREMENT BY 1 CACHE 1;\n"
        ));
        sql.push_str(&format!(
            "CREATE FUNCTION app.touch_{t}() RETURNS trigger LANGUAGE plpgsql AS $$\n\
             BEGIN NEW.name := 'x;y'; RETURN NEW; END;\n$$;\n"
        ));
    }

    for t in 0..tables {
        sql.push_str(&format!(
            "ALTER TABLE ONLY app.table_{t}\n    ADD CONSTRAINT table_{t}_pkey PRIMARY KEY (id);\n"
        ));
        if t > 0 {
            sql.push_str(&format!(
                "ALTER TABLE ONLY app.table_{t}\n    ADD CONSTRAINT table_{t}_parent_fkey \
                 FOREIGN KEY (parent_id) REFERENCES app.table_{}(id);\n",
                t - 1
            ));
        }
    }

    sql
}

fn bench_split_statements(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_statements");

    for tables in [10, 100, 1000] {
        let sql = generate_dump(tables);
        group.throughput(Throughput::Bytes(sql.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("dump", format!("{}_tables", tables)),
            &sql,
            |b, sql| b.iter(|| black_box(split_statements(sql).len())),
        );
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");

    let statements = [
        ("create_table", "CREATE TABLE IF NOT EXISTS app.t (id int)"),
        ("alter_table", "ALTER TABLE ONLY app.t ADD CONSTRAINT t_pkey PRIMARY KEY (id)"),
        ("create_index", "CREATE UNIQUE INDEX t_idx ON app.t USING btree (id)"),
        ("set", "SET statement_timeout = 0"),
    ];

    for (name, stmt) in statements {
        group.bench_function(name, |b| b.iter(|| StatementType::classify(black_box(stmt))));
    }

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for tables in [10, 100, 1000] {
        let sql = generate_dump(tables);
        group.throughput(Throughput::Bytes(sql.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("dump", format!("{}_tables", tables)),
            &sql,
            |b, sql| b.iter(|| black_box(parse(sql).model.len())),
        );
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let model = parse(&generate_dump(500)).model;
    let layout = Layout::default();

    for (name, mode) in [
        ("compact", Mode::Compact),
        ("normal", Mode::Normal),
        ("full", Mode::Full),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| black_box(render(&model, mode, &layout, OutputFormat::Mermaid)))
        });
    }

    group.bench_function("json", |b| {
        b.iter(|| black_box(render(&model, Mode::Normal, &layout, OutputFormat::Json)))
    });

    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let model = parse(&generate_dump(500)).model;
    let options = FilterOptions::new()
        .without_tables(["app.table_1*"])
        .unwrap()
        .connected_only(true);

    c.bench_function("filter_connected_only", |b| {
        b.iter(|| black_box(filter(&model, &options).len()))
    });
}

criterion_group!(
    benches,
    bench_split_statements,
    bench_classify,
    bench_parse,
    bench_render,
    bench_filter,
);

criterion_main!(benches);
