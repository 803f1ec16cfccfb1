//! M/M/1 throughput benchmark. Peripheral to the core budget (spec.md §2);
//! gated behind the `benchmark` feature the way the teacher crate gates its
//! own `benches/benchmarks.rs` behind `required-features = ["benchmark"]`.
use qsim::{Process, ProcessConfig, SamplerHandle, Source, SourceConfig, Successor};

criterion::criterion_main!(benches);
criterion::criterion_group! {
    name = benches;
    config = criterion::Criterion::default()
        .without_plots()
        .sample_size(10)
        .measurement_time(std::time::Duration::from_secs(2));
    targets = running_an_m_m_1_queue_to_completion,
}

fn running_an_m_m_1_queue_to_completion(c: &mut criterion::Criterion) {
    c.bench_function("M/M/1, N=50_000, rho=0.8", |b| {
        b.iter(|| {
            let sim = qsim::Simulator::new_handle();
            let inter_arrival = qsim_sampler::exponential(100.0, 1).unwrap();
            let service = qsim_sampler::exponential(80.0, 2).unwrap();
            let source = Source::new(sim.clone(), SourceConfig::new(50_000, inter_arrival)).unwrap();
            let process = Process::new(sim.clone(), ProcessConfig::new(1, SamplerHandle::direct(service))).unwrap();
            struct Sink;
            impl qsim::Station for Sink {
                fn receive(&mut self, _client: qsim::Client) -> anyhow::Result<()> {
                    Ok(())
                }
            }
            let sink = std::rc::Rc::new(std::cell::RefCell::new(Sink));
            source.borrow_mut().set_next(process.clone() as Successor);
            process.borrow_mut().set_next(sink.clone() as Successor);
            process.borrow_mut().set_next_cancel(sink as Successor);
            sim.borrow_mut().run().unwrap()
        })
    });
}
