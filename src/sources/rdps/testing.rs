//! Synthetic single-field GRIB2 messages for decoder tests
//!
//! Values are simple-packed with 8 bits, no scaling, so every value must be
//! a whole number in `0..=255`.

/// Horizontal grid of a synthetic message, scanning +i +j with i consecutive
#[derive(Debug, Clone, Copy)]
pub enum Grid {
    /// Regular latitude/longitude grid, `step` in degrees
    LatLon { ni: u32, nj: u32, first: (f64, f64), step: f64 },
    /// North polar stereographic grid, `spacing_m` in metres
    PolarStereographic {
        ni: u32,
        nj: u32,
        first: (f64, f64),
        lad: f64,
        lov: f64,
        spacing_m: f64,
    },
}

impl Grid {
    fn len(&self) -> usize {
        match *self {
            Grid::LatLon { ni, nj, .. } | Grid::PolarStereographic { ni, nj, .. } => (ni * nj) as usize,
        }
    }
}

pub struct Grib2Builder {
    grid: Grid,
    values: Vec<u8>,
}

/// Sign-and-magnitude encoding used by GRIB2 for signed integers
fn grib_int(v: i32) -> u32 {
    if v < 0 { 0x8000_0000 | v.unsigned_abs() } else { v as u32 }
}

fn micro_degrees(deg: f64) -> i32 {
    (deg * 1e6).round() as i32
}

fn micro_degrees_east(lon: f64) -> u32 {
    (lon.rem_euclid(360.0) * 1e6).round() as u32
}

impl Grib2Builder {
    pub fn new(grid: Grid) -> Self {
        let values = vec![0; grid.len()];
        Self { grid, values }
    }

    /// Value at each point, in scan order
    pub fn with_values(mut self, values: Vec<u8>) -> Self {
        assert_eq!(values.len(), self.grid.len());
        self.values = values;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let sections = [
            self.section1(),
            self.section3(),
            self.section4(),
            self.section5(),
            self.section6(),
            self.section7(),
        ];
        let total = 16 + sections.iter().map(Vec::len).sum::<usize>() + 4;

        let mut message = Vec::with_capacity(total);
        message.extend_from_slice(b"GRIB");
        message.extend_from_slice(&[0, 0]);
        message.push(0); // meteorological
        message.push(2); // edition
        message.extend_from_slice(&(total as u64).to_be_bytes());
        for section in &sections {
            message.extend_from_slice(section);
        }
        message.extend_from_slice(b"7777");
        message
    }

    pub fn write(&self, path: &std::path::Path) {
        std::fs::write(path, self.build()).unwrap();
    }

    fn section1(&self) -> Vec<u8> {
        let mut s = section_header(21, 1);
        s.extend_from_slice(&54u16.to_be_bytes()); // Montreal
        s.extend_from_slice(&0u16.to_be_bytes());
        s.extend_from_slice(&[4, 0, 1]);
        s.extend_from_slice(&2024u16.to_be_bytes());
        s.extend_from_slice(&[3, 1, 0, 0, 0]);
        s.extend_from_slice(&[0, 1]);
        s
    }

    fn section3(&self) -> Vec<u8> {
        let (template, body) = match self.grid {
            Grid::LatLon { ni, nj, first, step } => {
                let mut b = earth_shape();
                b.extend_from_slice(&ni.to_be_bytes());
                b.extend_from_slice(&nj.to_be_bytes());
                b.extend_from_slice(&0u32.to_be_bytes());
                b.extend_from_slice(&u32::MAX.to_be_bytes());
                b.extend_from_slice(&grib_int(micro_degrees(first.0)).to_be_bytes());
                b.extend_from_slice(&micro_degrees_east(first.1).to_be_bytes());
                b.push(48);
                let last_lat = first.0 + f64::from(nj - 1) * step;
                let last_lon = first.1 + f64::from(ni - 1) * step;
                b.extend_from_slice(&grib_int(micro_degrees(last_lat)).to_be_bytes());
                b.extend_from_slice(&micro_degrees_east(last_lon).to_be_bytes());
                let increment = micro_degrees(step) as u32;
                b.extend_from_slice(&increment.to_be_bytes());
                b.extend_from_slice(&increment.to_be_bytes());
                b.push(0b0100_0000);
                (0u16, b)
            }
            Grid::PolarStereographic {
                ni,
                nj,
                first,
                lad,
                lov,
                spacing_m,
            } => {
                let mut b = earth_shape();
                b.extend_from_slice(&ni.to_be_bytes());
                b.extend_from_slice(&nj.to_be_bytes());
                b.extend_from_slice(&grib_int(micro_degrees(first.0)).to_be_bytes());
                b.extend_from_slice(&micro_degrees_east(first.1).to_be_bytes());
                b.push(8);
                b.extend_from_slice(&grib_int(micro_degrees(lad)).to_be_bytes());
                b.extend_from_slice(&micro_degrees_east(lov).to_be_bytes());
                let spacing_mm = (spacing_m * 1e3).round() as u32;
                b.extend_from_slice(&spacing_mm.to_be_bytes());
                b.extend_from_slice(&spacing_mm.to_be_bytes());
                b.push(0); // north pole on the projection plane
                b.push(0b0100_0000);
                (20u16, b)
            }
        };
        let mut s = section_header(14 + body.len() as u32, 3);
        s.push(0);
        s.extend_from_slice(&(self.grid.len() as u32).to_be_bytes());
        s.extend_from_slice(&[0, 0]);
        s.extend_from_slice(&template.to_be_bytes());
        s.extend_from_slice(&body);
        s
    }

    fn section4(&self) -> Vec<u8> {
        let mut s = section_header(34, 4);
        s.extend_from_slice(&0u16.to_be_bytes());
        s.extend_from_slice(&0u16.to_be_bytes());
        s.extend_from_slice(&[6, 1, 2, 0, 0]); // total cloud cover, forecast
        s.extend_from_slice(&0u16.to_be_bytes());
        s.extend_from_slice(&[0, 1]);
        s.extend_from_slice(&1u32.to_be_bytes());
        s.extend_from_slice(&[1, 0]);
        s.extend_from_slice(&0u32.to_be_bytes());
        s.extend_from_slice(&[255, 0]);
        s.extend_from_slice(&0u32.to_be_bytes());
        s
    }

    fn section5(&self) -> Vec<u8> {
        let mut s = section_header(21, 5);
        s.extend_from_slice(&(self.values.len() as u32).to_be_bytes());
        s.extend_from_slice(&0u16.to_be_bytes());
        s.extend_from_slice(&0f32.to_be_bytes());
        s.extend_from_slice(&0u16.to_be_bytes());
        s.extend_from_slice(&0u16.to_be_bytes());
        s.extend_from_slice(&[8, 0]);
        s
    }

    fn section6(&self) -> Vec<u8> {
        let mut s = section_header(6, 6);
        s.push(255);
        s
    }

    fn section7(&self) -> Vec<u8> {
        let mut s = section_header(5 + self.values.len() as u32, 7);
        s.extend_from_slice(&self.values);
        s
    }
}

fn section_header(len: u32, number: u8) -> Vec<u8> {
    let mut s = len.to_be_bytes().to_vec();
    s.push(number);
    s
}

/// Spherical earth, radius 6371229 m
fn earth_shape() -> Vec<u8> {
    let mut b = vec![6];
    for _ in 0..3 {
        b.push(0);
        b.extend_from_slice(&0u32.to_be_bytes());
    }
    b
}

/// Serve `files` (path, body) over HTTP on a local port; anything else is a 404
pub async fn serve(files: Vec<(String, Vec<u8>)>) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let files = files.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = match files.iter().find(|(p, _)| *p == path) {
                    Some((_, body)) => ("200 OK", body.clone()),
                    None => ("404 Not Found", Vec::new()),
                };
                let head = format!(
                    "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(&body).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    format!("http://{addr}/")
}

/// Plain client without retries
pub fn client() -> reqwest_middleware::ClientWithMiddleware {
    reqwest_middleware::ClientBuilder::new(reqwest::Client::new()).build()
}
