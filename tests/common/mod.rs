#![allow(dead_code)]

use std::io::Write;
use byteorder::{WriteBytesExt, LE};

pub const IDENTITY: [f32; 16] = [
    1., 0., 0., 0.,
    0., 1., 0., 0.,
    0., 0., 1., 0.,
    0., 0., 0., 1.,
];

/// Column-major translation matrix.
pub fn translation(x: f32, y: f32, z: f32) -> [f32; 16] {
    let mut m = IDENTITY;
    m[12] = x;
    m[13] = y;
    m[14] = z;
    m
}

pub fn write_lendel<W: Write>(w: &mut W, data: &[u8]) {
    w.write_i32::<LE>(data.len() as i32).unwrap();
    w.write_all(data).unwrap();
}

pub fn write_section<W: Write>(w: &mut W, name: &str, data: &[u8]) {
    w.write_i32::<LE>((12 + name.len() + data.len()) as i32).unwrap();
    w.write_i32::<LE>(name.len() as i32).unwrap();
    w.write_i32::<LE>(data.len() as i32).unwrap();
    w.write_all(name.as_bytes()).unwrap();
    w.write_all(data).unwrap();
}

/// Sections in the order they will be written.  Setting a name that already
/// exists replaces it in place.
#[derive(Clone, Default)]
pub struct AssetWriter {
    sections: Vec<(String, Vec<u8>)>,
}

impl AssetWriter {
    pub fn raw(&mut self, name: &str, data: Vec<u8>) -> &mut Self {
        match self.sections.iter_mut().find(|(n, _)| n == name) {
            Some(s) => s.1 = data,
            None => self.sections.push((name.to_owned(), data)),
        }
        self
    }

    /// Append a section even if one with the same name exists.
    pub fn duplicate(&mut self, name: &str, data: Vec<u8>) -> &mut Self {
        self.sections.push((name.to_owned(), data));
        self
    }

    pub fn remove(&mut self, name: &str) -> &mut Self {
        self.sections.retain(|(n, _)| n != name);
        self
    }

    pub fn strings(&mut self, name: &str, xs: &[&str]) -> &mut Self {
        let mut w = Vec::new();
        for x in xs {
            write_lendel(&mut w, x.as_bytes());
        }
        self.raw(name, w)
    }

    pub fn ints(&mut self, name: &str, xs: &[i32]) -> &mut Self {
        let mut w = Vec::new();
        for &x in xs {
            w.write_i32::<LE>(x).unwrap();
        }
        self.raw(name, w)
    }

    pub fn matrices(&mut self, name: &str, ms: &[[f32; 16]]) -> &mut Self {
        let mut w = Vec::new();
        for m in ms {
            for &x in m {
                w.write_f32::<LE>(x).unwrap();
            }
        }
        self.raw(name, w)
    }

    pub fn float_chunks(&mut self, name: &str, chunks: &[Vec<f32>]) -> &mut Self {
        let mut w = Vec::new();
        for c in chunks {
            let mut x = Vec::new();
            for &f in c {
                x.write_f32::<LE>(f).unwrap();
            }
            write_lendel(&mut w, &x);
        }
        self.raw(name, w)
    }

    pub fn int_chunks(&mut self, name: &str, chunks: &[Vec<i32>]) -> &mut Self {
        let mut w = Vec::new();
        for c in chunks {
            let mut x = Vec::new();
            for &i in c {
                x.write_i32::<LE>(i).unwrap();
            }
            write_lendel(&mut w, &x);
        }
        self.raw(name, w)
    }

    pub fn pair_chunks(&mut self, name: &str, chunks: &[Vec<(i32, f32)>]) -> &mut Self {
        let mut w = Vec::new();
        for c in chunks {
            let mut x = Vec::new();
            for &(i, f) in c {
                x.write_i32::<LE>(i).unwrap();
                x.write_f32::<LE>(f).unwrap();
            }
            write_lendel(&mut w, &x);
        }
        self.raw(name, w)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, data) in &self.sections {
            write_section(&mut out, name, data);
        }
        out
    }
}

/// Three chained nodes, one bone, and a single triangle mesh attached to the
/// first node.  Ends with a section the parser doesn't know.
pub fn sample() -> AssetWriter {
    let mut w = AssetWriter::default();
    w.strings("NODENAME", &["Hello", "Abcd", "ExampleName"])
        .ints("NODEPARENT", &[-1, 0, 1])
        .matrices("NODEMATRIX", &[IDENTITY, IDENTITY, IDENTITY])
        .ints("NODEMESH", &[0, -1, -1])
        .strings("BONENAME", &["Hello"])
        .ints("BONEPARENT", &[-1])
        .matrices("BONEMATRIX", &[IDENTITY])
        .strings("MESHNAME", &["Mesh0"])
        .float_chunks("MESHVERT", &[vec![
            0., 0., 0.,
            1., 0., 0.,
            1., 1., 0.,
        ]])
        .int_chunks("MESHINDEX", &[vec![0, 1, 2]])
        .pair_chunks("MESHBONEWEIGHT", &[vec![(0, 1.), (2, 1.)]])
        .matrices("MESHROOTMATRIX", &[IDENTITY])
        .ints("MESHBONECOUNT", &[1])
        .raw("HELLO", b"datadata".to_vec());
    w
}

/// Two meshes skinned with per-vertex weights.  Mesh 0 owns bones 0 and 1,
/// mesh 1 owns bone 2.
pub fn per_vertex_sample() -> AssetWriter {
    let mut w = AssetWriter::default();
    w.strings("NODENAME", &["Root", "Body", "Hat"])
        .ints("NODEPARENT", &[-1, 0, 0])
        .matrices("NODEMATRIX", &[IDENTITY, translation(0., 1., 0.), translation(0., 2., 0.)])
        .ints("NODEMESH", &[-1, 0, 1])
        .strings("BONENAME", &["Hip", "Spine", "HatBone"])
        .ints("BONEPARENT", &[-1, 0, -1])
        .matrices("BONEMATRIX", &[translation(0., 1., 0.), translation(0., 1., 0.), IDENTITY])
        .strings("MESHNAME", &["BodyMesh", "HatMesh"])
        .ints("MESHBONECOUNT", &[2, 1])
        .float_chunks("MESHVERT", &[
            vec![0., 0., 0., 1., 0., 0., 0., 1., 0.],
            vec![0., 0., 0., 1., 0., 0., 0., 0., 1.],
        ])
        .int_chunks("MESHINDEX", &[vec![0, 1, 2], vec![0, 2, 1]])
        .matrices("MESHROOTMATRIX", &[translation(5., 0., 0.), IDENTITY])
        .pair_chunks("MESHVERTBONEWEIGHT", &[
            // BodyMesh
            vec![(0, 0.6), (1, 0.2)],
            vec![(1, 1.)],
            vec![],
            // HatMesh
            vec![(0, 2.)],
            vec![(0, 0.)],
            vec![(0, 0.5)],
        ]);
    w
}
