// SPDX-License-Identifier: Apache-2.0

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use braid::Buffer;

const SIZES: &[usize] = &[256, 8192, 64 * 1024];

fn write_read(c: &mut Criterion) {
	let mut group = c.benchmark_group("write_read");
	for &size in SIZES {
		let data = vec![0xA5u8; size];
		group.throughput(Throughput::Bytes(size as u64));
		group.bench_function(format!("{size}B"), |b| {
			b.iter(|| {
				let mut buf = Buffer::new();
				buf.write_from_slice(black_box(&data)).unwrap();
				black_box(buf.read_to_vec())
			})
		});
	}
	group.finish();
}

fn move_between_buffers(c: &mut Criterion) {
	let mut group = c.benchmark_group("move_to");
	for &size in SIZES {
		let data = vec![0x5Au8; size];
		group.throughput(Throughput::Bytes(size as u64));
		group.bench_function(format!("{size}B"), |b| {
			b.iter(|| {
				let mut src = Buffer::new();
				src.write_from_slice(&data).unwrap();
				let mut dst = Buffer::new();
				src.move_to(black_box(&mut dst), size).unwrap();
				black_box(dst.size())
			})
		});
	}
	group.finish();
}

fn snapshot(c: &mut Criterion) {
	let data = vec![0x3Cu8; 64 * 1024];
	c.bench_function("to_byte_string_64K", |b| {
		let mut buf = Buffer::new();
		buf.write_from_slice(&data).unwrap();
		b.iter(|| black_box(buf.to_byte_string().byte_size()))
	});
}

criterion_group!(benches, write_read, move_between_buffers, snapshot);
criterion_main!(benches);
