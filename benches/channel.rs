use criterion::{black_box, criterion_group, criterion_main, Criterion};
use modswitch::{Bias, StateReader, StateWriter, SwitchState};

fn channel_benchmark(c: &mut Criterion) {
    let name = format!("/modsw_bench_{}", std::process::id());
    let writer = StateWriter::create(&name, SwitchState::Zero).expect("create channel");
    let reader = StateReader::attach(&name).expect("attach channel");

    c.bench_function("decode_and_publish", |b| {
        let mut levels = (false, false);
        b.iter(|| {
            levels = (!levels.1, levels.0);
            writer.write_state(SwitchState::decode(levels.0, levels.1, black_box(Bias::PullUp)));
        })
    });

    c.bench_function("read_state", |b| {
        b.iter(|| black_box(reader.read_state().expect("valid state")))
    });
}

criterion_group!(benches, channel_benchmark);
criterion_main!(benches);
