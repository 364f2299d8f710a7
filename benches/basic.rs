use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use serial_transport::port::{Configuration, DeviceFamily, MockBackend, Parity, SerialPort};
use std::time::Duration;

fn open_port_with(chunks: &[&[u8]]) -> SerialPort<MockBackend> {
    let mock = MockBackend::new();
    for chunk in chunks {
        mock.enqueue_chunk(chunk);
    }
    let mut port = SerialPort::with_backend("/dev/ttyUSB0", Configuration::default(), mock);
    port.open().unwrap();
    port
}

pub fn bench_read_line(c: &mut Criterion) {
    let long_line = vec![b'x'; 4096];

    c.bench_function("read_line_single_chunk", |b| {
        b.iter_batched(
            || open_port_with(&[b"TEMP=21.5\r\n"]),
            |mut port| black_box(port.read_line(Duration::from_millis(100)).unwrap()),
            BatchSize::SmallInput,
        )
    });

    c.bench_function("read_line_4k_then_newline", |b| {
        b.iter_batched(
            || open_port_with(&[&long_line, b"\n"]),
            |mut port| black_box(port.read_line(Duration::from_millis(100)).unwrap()),
            BatchSize::SmallInput,
        )
    });

    c.bench_function("read_line_from_pending", |b| {
        b.iter_batched(
            || {
                let mut port = open_port_with(&[b"A\nB\nC\n"]);
                port.read_line(Duration::from_millis(100)).unwrap();
                port
            },
            |mut port| black_box(port.read_line(Duration::from_millis(100)).unwrap()),
            BatchSize::SmallInput,
        )
    });
}

pub fn bench_validation(c: &mut Criterion) {
    c.bench_function("configuration_new", |b| {
        b.iter(|| Configuration::new(black_box(115200), 7, Parity::Even, 2))
    });

    c.bench_function("device_allow_list", |b| {
        b.iter(|| {
            black_box(DeviceFamily::Unix.accepts(black_box("/dev/ttyACM0")));
            black_box(DeviceFamily::Windows.accepts(black_box("COM3 & del x")));
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(300))
        .measurement_time(Duration::from_secs(2));
    targets = bench_read_line, bench_validation
}
criterion_main!(benches);
