use criterion::{criterion_group, criterion_main, Criterion, black_box};

use glam::IVec3;
use voxscript::scripting::ScriptHost;
use voxscript::core::EngineConfig;
use voxscript::voxel::{Color, SelectionBox, Volume};

/// Solid sphere of radius `r` centered on the origin
fn create_test_sphere(r: i32) -> Volume {
    let mut volume = Volume::new();
    for z in -r..=r {
        for y in -r..=r {
            for x in -r..=r {
                if x * x + y * y + z * z <= r * r {
                    volume.set_at(IVec3::new(x, y, z), Color::rgb(200, 100, 50));
                }
            }
        }
    }
    volume
}

fn bench_fill_sphere_16(c: &mut Criterion) {
    c.bench_function("fill_sphere_16", |b| {
        b.iter(|| create_test_sphere(black_box(16)));
    });
}

fn bench_iter_sphere_32(c: &mut Criterion) {
    let volume = create_test_sphere(32);

    c.bench_function("iter_sphere_32", |b| {
        b.iter(|| volume.iter().filter(|(_, c)| c.a > 0).count());
    });
}

fn bench_copy_sphere_32(c: &mut Criterion) {
    let volume = create_test_sphere(32);

    c.bench_function("copy_then_write_sphere_32", |b| {
        b.iter(|| {
            let mut copy = black_box(&volume).copy();
            copy.set_at(IVec3::ZERO, Color::rgb(1, 2, 3));
            copy
        });
    });
}

fn bench_dilate_sphere_8(c: &mut Criterion) {
    let source = create_test_sphere(8);

    c.bench_function("dilate_sphere_8", |b| {
        b.iter(|| {
            let mut volume = source.copy();
            for (pos, color) in source.iter() {
                for z in -1..=1 {
                    for y in -1..=1 {
                        for x in -1..=1 {
                            volume.set_at(pos + IVec3::new(x, y, z), color);
                        }
                    }
                }
            }
            volume
        });
    });
}

fn bench_box_iter_rotated(c: &mut Criterion) {
    let sel = SelectionBox::new(
        glam::Vec3::new(0.5, 0.0, 0.0),
        glam::Vec3::new(20.0, 20.0, 0.0),
        glam::Vec3::new(-20.0, 20.0, 0.0),
        glam::Vec3::new(0.0, 0.0, 32.0),
    );

    c.bench_function("box_iter_rotated", |b| {
        b.iter(|| {
            let mut count = 0usize;
            black_box(&sel).iter_voxels(|_| count += 1);
            count
        });
    });
}

fn bench_script_dilate_line_4(c: &mut Criterion) {
    let host = ScriptHost::new(&EngineConfig::default()).expect("script host");
    host.run_string(
        r#"
        function dilate(r)
            local vol = Volume()
            for x = -r, r do vol:setAt({x, 0, 0}, {255, 0, 0, 255}) end
            local src = vol:copy()
            src:iter(function(p, c)
                for z = -1, 1 do for y = -1, 1 do for x = -1, 1 do
                    vol:setAt({p.x + x, p.y + y, p.z + z}, c)
                end end end
            end)
            return vol:count()
        end
        "#,
        "bench",
    )
    .expect("bench script");
    let dilate: mlua::Function = host.lua().globals().raw_get("dilate").expect("dilate");

    c.bench_function("script_dilate_line_4", |b| {
        b.iter(|| dilate.call::<usize>(black_box(4)).expect("dilate call"));
    });
}

criterion_group!(
    benches,
    bench_fill_sphere_16,
    bench_iter_sphere_32,
    bench_copy_sphere_32,
    bench_dilate_sphere_8,
    bench_box_iter_rotated,
    bench_script_dilate_line_4,
);
criterion_main!(benches);
