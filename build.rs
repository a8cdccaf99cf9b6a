use entities::ENTITIES;
use std::io::Write;
use std::{env, path::PathBuf};

fn main() {
    let out_dir: PathBuf = env::var("OUT_DIR").unwrap().parse().unwrap();

    // entity::lookup receives the bare entity name ("amp" for "&amp;"), so
    // only the ENTITIES rows with a trailing ";" apply. The table ships
    // unsorted with case variants interleaved; sort for binary search.
    let mut named = ENTITIES
        .iter()
        .filter(|e| e.entity.starts_with('&') && e.entity.ends_with(';'))
        .collect::<Vec<_>>();
    // sort by the bare name: the lookup never sees the `&`/`;` framing
    named.sort_by(|a, b| {
        a.entity[1..a.entity.len() - 1].cmp(&b.entity[1..b.entity.len() - 1])
    });
    named.dedup_by(|a, b| a.entity == b.entity);

    let out = std::fs::File::create(out_dir.join("entitydata.rs")).unwrap();
    let mut bw = std::io::BufWriter::new(out);
    writeln!(bw, "mod entitydata {{").unwrap();
    writeln!(
        bw,
        "    pub static NAMED_ENTITIES: &[(&'static str, &'static str); {}] = &[",
        named.len()
    )
    .unwrap();
    for e in named {
        writeln!(
            bw,
            "        ({:?}, {:?}),",
            &e.entity[1..e.entity.len() - 1],
            &e.characters
        )
        .unwrap();
    }
    writeln!(bw, "    ];").unwrap();
    writeln!(bw, "}}").unwrap();
}
