//! YM2151 lookup tables
//!
//! Two groups of tables drive the core:
//!
//! - [`SharedTables`]: attenuation (`tl`), sine-to-attenuation (`sin`) and the
//!   D1L sustain thresholds. They do not depend on the clock and are computed
//!   once per process ([`shared_tables`]).
//! - [`ClockTables`]: frequency deltas, DT1 detune deltas, noise periods and
//!   timer deltas. These are a pure function of (chip clock, sample rate) and
//!   are owned by each chip.
//!
//! All integer truncation and rounding steps follow the chip exactly; every
//! other computation in the core is fed from these values.

use std::f64::consts::PI;
use std::sync::OnceLock;

/// Fixed-point bits of the phase accumulator (16.16)
pub const FREQ_SH: u32 = 16;
/// Fixed-point bits of the envelope timer
pub const EG_SH: u32 = 16;
/// Fixed-point bits of the LFO timer
pub const LFO_SH: u32 = 10;
/// Fixed-point bits of the timer A/B counters
pub const TIMER_SH: u32 = 16;
/// Mask of the fractional part of the phase accumulator
pub const FREQ_MASK: u32 = (1 << FREQ_SH) - 1;

/// Envelope resolution in bits
pub const ENV_BITS: u32 = 10;
const ENV_LEN: usize = 1 << ENV_BITS;
const ENV_STEP: f64 = 128.0 / ENV_LEN as f64;

/// Envelope attenuation at silence
pub const MAX_ATT_INDEX: i32 = (ENV_LEN - 1) as i32;
/// Envelope attenuation at full volume
pub const MIN_ATT_INDEX: i32 = 0;

/// Sine table resolution in bits
pub const SIN_BITS: u32 = 10;
/// Sine table length
pub const SIN_LEN: usize = 1 << SIN_BITS;
/// Sine table index mask
pub const SIN_MASK: u32 = (SIN_LEN - 1) as u32;

/// Resolution of one attenuation tier
pub const TL_RES_LEN: usize = 256;
/// 13 tiers, positive and negative, 256 steps each
pub const TL_TAB_LEN: usize = 13 * 2 * TL_RES_LEN;
/// Operators whose attenuation reaches this value produce no output
pub const ENV_QUIET: u32 = (TL_TAB_LEN >> 3) as u32;

/// Octaves stored in the frequency table (one below, eight real, two above)
pub const FREQ_OCTAVES: usize = 11;
/// Key-fraction steps per octave (12 notes x 64 cents)
pub const CENTS_PER_OCTAVE: usize = 768;
/// Total length of the frequency delta table
pub const FREQ_TABLE_LEN: usize = FREQ_OCTAVES * CENTS_PER_OCTAVE;

/// Number of Timer A load values
pub const TIMER_A_ENTRIES: usize = 1024;
/// Number of Timer B load values
pub const TIMER_B_ENTRIES: usize = 256;

/// Phase increments of the real chip for octave 2, one entry per cent
/// (10.10 fixed point, dumped from the chip's internal ROM).
#[rustfmt::skip]
const PHASEINC_ROM: [u16; CENTS_PER_OCTAVE] = [
    1299,1300,1301,1302,1303,1304,1305,1306,1308,1309,1310,1311,1313,1314,1315,1316,
    1318,1319,1320,1321,1322,1323,1324,1325,1327,1328,1329,1330,1332,1333,1334,1335,
    1337,1338,1339,1340,1341,1342,1343,1344,1346,1347,1348,1349,1351,1352,1353,1354,
    1356,1357,1358,1359,1361,1362,1363,1364,1366,1367,1368,1369,1371,1372,1373,1374,
    1376,1377,1378,1379,1381,1382,1383,1384,1386,1387,1388,1389,1391,1392,1393,1394,
    1396,1397,1398,1399,1401,1402,1403,1404,1406,1407,1408,1409,1411,1412,1413,1414,
    1416,1417,1418,1419,1421,1422,1423,1424,1426,1427,1429,1430,1431,1432,1434,1435,
    1437,1438,1439,1440,1442,1443,1444,1445,1447,1448,1449,1450,1452,1453,1454,1455,
    1458,1459,1460,1461,1463,1464,1465,1466,1468,1469,1471,1472,1473,1474,1476,1477,
    1479,1480,1481,1482,1484,1485,1486,1487,1489,1490,1492,1493,1494,1495,1497,1498,
    1501,1502,1503,1504,1506,1507,1509,1510,1512,1513,1514,1515,1517,1518,1520,1521,
    1523,1524,1525,1526,1528,1529,1531,1532,1534,1535,1536,1537,1539,1540,1542,1543,
    1545,1546,1547,1548,1550,1551,1553,1554,1556,1557,1558,1559,1561,1562,1564,1565,
    1567,1568,1569,1570,1572,1573,1575,1576,1578,1579,1580,1581,1583,1584,1586,1587,
    1590,1591,1592,1593,1595,1596,1598,1599,1601,1602,1604,1605,1607,1608,1609,1610,
    1613,1614,1615,1616,1618,1619,1621,1622,1624,1625,1627,1628,1630,1631,1632,1633,
    1637,1638,1639,1640,1642,1643,1645,1646,1648,1649,1651,1652,1654,1655,1656,1657,
    1660,1661,1663,1664,1666,1667,1669,1670,1672,1673,1675,1676,1678,1679,1681,1682,
    1685,1686,1688,1689,1691,1692,1694,1695,1697,1698,1700,1701,1703,1704,1706,1707,
    1709,1710,1712,1713,1715,1716,1718,1719,1721,1722,1724,1725,1727,1728,1730,1731,
    1734,1735,1737,1738,1740,1741,1743,1744,1746,1748,1749,1751,1752,1754,1755,1757,
    1759,1760,1762,1763,1765,1766,1768,1769,1771,1773,1774,1776,1777,1779,1780,1782,
    1785,1786,1788,1789,1791,1793,1794,1796,1798,1799,1801,1802,1804,1806,1807,1809,
    1811,1812,1814,1815,1817,1819,1820,1822,1824,1825,1827,1828,1830,1832,1833,1835,
    1837,1838,1840,1841,1843,1845,1846,1848,1850,1851,1853,1854,1856,1858,1859,1861,
    1864,1865,1867,1868,1870,1872,1873,1875,1877,1879,1880,1882,1884,1885,1887,1888,
    1891,1892,1894,1895,1897,1899,1900,1902,1904,1906,1907,1909,1911,1912,1914,1915,
    1918,1919,1921,1923,1925,1926,1928,1930,1932,1933,1935,1937,1939,1940,1942,1944,
    1946,1947,1949,1951,1953,1954,1956,1958,1960,1961,1963,1965,1967,1968,1970,1972,
    1975,1976,1978,1980,1982,1983,1985,1987,1989,1990,1992,1994,1996,1997,1999,2001,
    2003,2004,2006,2008,2010,2011,2013,2015,2017,2019,2021,2022,2024,2026,2028,2029,
    2032,2033,2035,2037,2039,2041,2043,2044,2047,2048,2050,2052,2054,2056,2058,2059,
    2062,2063,2065,2067,2069,2071,2073,2074,2077,2078,2080,2082,2084,2086,2088,2089,
    2092,2093,2095,2097,2099,2101,2103,2104,2107,2108,2110,2112,2114,2116,2118,2119,
    2122,2123,2125,2127,2129,2131,2133,2134,2137,2139,2141,2142,2145,2146,2148,2150,
    2153,2154,2156,2158,2160,2162,2164,2165,2168,2170,2172,2173,2176,2177,2179,2181,
    2185,2186,2188,2190,2192,2194,2196,2197,2200,2202,2204,2205,2208,2209,2211,2213,
    2216,2218,2220,2222,2223,2226,2227,2230,2232,2234,2236,2238,2239,2242,2243,2246,
    2249,2251,2253,2255,2256,2259,2260,2263,2265,2267,2269,2271,2272,2275,2276,2279,
    2281,2283,2285,2287,2288,2291,2292,2295,2297,2299,2301,2303,2304,2307,2308,2311,
    2315,2317,2319,2321,2322,2325,2326,2329,2331,2333,2335,2337,2338,2341,2342,2345,
    2348,2350,2352,2354,2355,2358,2359,2362,2364,2366,2368,2370,2371,2374,2375,2378,
    2382,2384,2386,2388,2389,2392,2393,2396,2398,2400,2402,2404,2407,2410,2411,2414,
    2417,2419,2421,2423,2424,2427,2428,2431,2433,2435,2437,2439,2442,2445,2446,2449,
    2452,2454,2456,2458,2459,2462,2463,2466,2468,2470,2472,2474,2477,2480,2481,2484,
    2488,2490,2492,2494,2495,2498,2499,2502,2504,2506,2508,2510,2513,2516,2517,2520,
    2524,2526,2528,2530,2531,2534,2535,2538,2540,2542,2544,2546,2549,2552,2553,2556,
    2561,2563,2565,2567,2568,2571,2572,2575,2577,2579,2581,2583,2586,2589,2590,2593,
];

/// DT1 detune amounts in chip units, 32 key-code groups per DT1 setting.
#[rustfmt::skip]
const DT1_TAB: [u8; 4 * 32] = [
    // DT1 = 0
     0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
     0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    // DT1 = 1
     0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2,
     2, 3, 3, 3, 4, 4, 4, 5, 5, 6, 6, 7, 8, 8, 8, 8,
    // DT1 = 2
     1, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3, 3, 4, 4, 4, 5,
     5, 6, 6, 7, 8, 8, 9,10,11,12,13,14,16,16,16,16,
    // DT1 = 3
     2, 2, 2, 2, 2, 3, 3, 3, 4, 4, 4, 5, 5, 6, 6, 7,
     8, 8, 9,10,11,12,13,14,16,17,19,20,22,22,22,22,
];

/// DT2 offsets into the frequency table (in cents)
pub const DT2_TAB: [u32; 4] = [0, 384, 500, 608];

/// Clock-independent tables, shared by every chip instance
#[derive(Clone, PartialEq, Eq)]
pub struct SharedTables {
    /// Attenuation to linear output (13 tiers x +/- x 256 steps)
    pub tl: Box<[i32]>,
    /// Sine phase to attenuation; bit 0 carries the sign
    pub sin: Box<[u32]>,
    /// D1L register value to sustain attenuation level
    pub d1l: [u32; 16],
}

impl SharedTables {
    /// Compute all clock-independent tables
    pub fn build() -> Self {
        Self {
            tl: build_tl_table(),
            sin: build_sin_table(),
            d1l: build_d1l_table(),
        }
    }
}

impl std::fmt::Debug for SharedTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedTables")
            .field("tl_len", &self.tl.len())
            .field("sin_len", &self.sin.len())
            .field("d1l", &self.d1l)
            .finish_non_exhaustive()
    }
}

static SHARED_TABLES: OnceLock<SharedTables> = OnceLock::new();

/// Process-wide shared tables, computed on first use and never mutated
pub fn shared_tables() -> &'static SharedTables {
    SHARED_TABLES.get_or_init(SharedTables::build)
}

fn build_tl_table() -> Box<[i32]> {
    let mut tl = vec![0i32; TL_TAB_LEN];

    for x in 0..TL_RES_LEN {
        let m = (f64::from(1u32 << 16) / 2f64.powf((x + 1) as f64 * (ENV_STEP / 4.0) / 8.0)).floor();

        // 16 bits here, reduce to 12 then round to 11
        let mut n = (m as i32) >> 4;
        n = if n & 1 != 0 { (n >> 1) + 1 } else { n >> 1 };
        // 13 bits as in the real chip
        n <<= 2;

        tl[x * 2] = n;
        tl[x * 2 + 1] = -n;

        for i in 1..13 {
            let base = x * 2 + i * 2 * TL_RES_LEN;
            tl[base] = tl[x * 2] >> i;
            tl[base + 1] = -tl[base];
        }
    }

    tl.into_boxed_slice()
}

fn build_sin_table() -> Box<[u32]> {
    let mut sin = vec![0u32; SIN_LEN];

    for (i, slot) in sin.iter_mut().enumerate() {
        // Non-standard sine: sampled half a step off zero, as on the chip
        let m = (((i * 2) + 1) as f64 * PI / SIN_LEN as f64).sin();

        let o = if m > 0.0 {
            8.0 * (1.0 / m).ln() / 2f64.ln()
        } else {
            8.0 * (-1.0 / m).ln() / 2f64.ln()
        };
        let o = o / (ENV_STEP / 4.0);

        let mut n = (2.0 * o) as i32;
        n = if n & 1 != 0 { (n >> 1) + 1 } else { n >> 1 };

        *slot = (n * 2) as u32 + u32::from(m < 0.0);
    }

    sin.into_boxed_slice()
}

fn build_d1l_table() -> [u32; 16] {
    let mut d1l = [0u32; 16];
    for (i, slot) in d1l.iter_mut().enumerate() {
        // 3 dB per step, except all bits set which jumps to 93 dB
        let steps = if i != 15 { i } else { i + 16 };
        *slot = (steps as f64 * (4.0 / ENV_STEP)) as u32;
    }
    d1l
}

/// Tables derived from the chip clock and the output sample rate
#[derive(Clone, PartialEq, Eq)]
pub struct ClockTables {
    /// Phase increment per (octave, cent) for MUL = 1/2
    pub freq: Box<[u32]>,
    /// DT1 phase offsets; rows 4..8 are the negated rows 0..4
    pub dt1: Box<[i32]>,
    /// Noise generator phase increment per noise period setting
    pub noise: [u32; 32],
    /// Timer A period per load value, in samples (16.16)
    pub timer_a: Box<[u64]>,
    /// Timer B period per load value, in samples (16.16)
    pub timer_b: Box<[u64]>,
    /// Envelope timer increment per output sample
    pub eg_timer_add: u32,
    /// LFO timer increment per output sample
    pub lfo_timer_add: u32,
}

impl ClockTables {
    /// Build every clock dependent table for the given clock and sample rate
    ///
    /// Both arguments must be non-zero; [`crate::ChipConfig::validate`]
    /// guarantees this for chips built through the public constructors.
    pub fn new(clock: u32, sample_rate: u32) -> Self {
        let clock_f = f64::from(clock);
        let rate_f = f64::from(sample_rate);
        let scaler = (clock_f / 64.0) / rate_f;

        Self {
            freq: build_freq_table(scaler),
            dt1: build_dt1_table(clock_f, rate_f),
            noise: build_noise_table(scaler),
            timer_a: build_timer_table(TIMER_A_ENTRIES, 64.0, clock_f, rate_f),
            timer_b: build_timer_table(TIMER_B_ENTRIES, 1024.0, clock_f, rate_f),
            eg_timer_add: (f64::from(1u32 << EG_SH) * (clock_f / 64.0) / rate_f) as u32,
            lfo_timer_add: (f64::from(1u32 << LFO_SH) * (clock_f / 64.0) / rate_f) as u32,
        }
    }

    /// Timer A period (16.16 samples) for a 10-bit load value
    #[inline]
    pub fn timer_a_period(&self, index: u32) -> u64 {
        self.timer_a[(index as usize) & (TIMER_A_ENTRIES - 1)]
    }

    /// Timer B period (16.16 samples) for an 8-bit load value
    #[inline]
    pub fn timer_b_period(&self, index: u32) -> u64 {
        self.timer_b[(index as usize) & (TIMER_B_ENTRIES - 1)]
    }
}

impl std::fmt::Debug for ClockTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockTables")
            .field("eg_timer_add", &self.eg_timer_add)
            .field("lfo_timer_add", &self.lfo_timer_add)
            .field("noise", &self.noise)
            .finish_non_exhaustive()
    }
}

fn build_freq_table(scaler: f64) -> Box<[u32]> {
    let mut freq = vec![0u32; FREQ_TABLE_LEN];
    // phaseinc_rom values are already 10.10
    let mult = f64::from(1u32 << (FREQ_SH - 10));
    let oct = CENTS_PER_OCTAVE;

    for i in 0..oct {
        let phaseinc = f64::from(PHASEINC_ROM[i]) * scaler;

        // Octave 2 is the reference octave
        let reference = ((phaseinc * mult) as i32 as u32) & 0xffff_ffc0;
        freq[oct + 2 * oct + i] = reference;

        for j in 0..2 {
            freq[oct + j * oct + i] = (reference >> (2 - j)) & 0xffff_ffc0;
        }
        for j in 3..8 {
            freq[oct + j * oct + i] = reference << (j - 2);
        }
    }

    // Octave -1 repeats the lowest note of octave 0
    let lowest = freq[oct];
    freq[..oct].fill(lowest);

    // Octaves 8 and 9 repeat the highest note of octave 7
    let highest = freq[oct + 8 * oct - 1];
    freq[oct + 8 * oct..].fill(highest);

    freq.into_boxed_slice()
}

fn build_dt1_table(clock: f64, sample_rate: f64) -> Box<[i32]> {
    let mut dt1 = vec![0i32; 8 * 32];
    let mult = f64::from(1u32 << FREQ_SH);

    for j in 0..4 {
        for i in 0..32 {
            let hz = (f64::from(DT1_TAB[j * 32 + i]) * (clock / 64.0)) / f64::from(1u32 << 20);
            let phaseinc = (hz * SIN_LEN as f64) / sample_rate;

            let delta = (phaseinc * mult) as i32;
            dt1[j * 32 + i] = delta;
            dt1[(j + 4) * 32 + i] = -delta;
        }
    }

    dt1.into_boxed_slice()
}

fn build_noise_table(scaler: f64) -> [u32; 32] {
    let mut noise = [0u32; 32];
    for (i, slot) in noise.iter_mut().enumerate() {
        // Periods 30 and 31 are the same
        let period = if i != 31 { i as i32 } else { 30 };
        let j = 32 - period;
        // Samples per shift of the register, truncated
        let samples = (65536.0 / f64::from(j * 32)) as i32;
        *slot = (f64::from(samples * 64) * scaler) as u32;
    }
    noise
}

fn build_timer_table(entries: usize, cycles: f64, clock: f64, sample_rate: f64) -> Box<[u64]> {
    let mult = f64::from(1u32 << TIMER_SH);
    (0..entries)
        .map(|i| {
            let seconds = cycles * (entries - i) as f64 / clock;
            (seconds * sample_rate * mult) as u64
        })
        .collect()
}
