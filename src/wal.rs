use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use ulid::Ulid;

use crate::model::{Event, Reservation, ReservationKind};
use crate::store::{MemoryStore, ReservationStore, StoreError};

/// Encode a single event to [len][bincode][crc32] format.
fn encode_event(writer: &mut impl Write, event: &Event) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = payload.len() as u32;
    let crc = crc32fast::hash(&payload);
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc.to_le_bytes())?;
    Ok(())
}

/// Append-only reservation journal.
///
/// Format per entry: `[u32: len][bincode: Event][u32: crc32]`
/// - `len` is the byte length of the bincode payload (not including the CRC).
/// - Truncated last entry (crash) is safely discarded via length-prefix + CRC check.
pub struct Wal {
    writer: BufWriter<File>,
    path: PathBuf,
    appends_since_compact: u64,
}

impl Wal {
    /// Open (or create) the journal file at `path`.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            appends_since_compact: 0,
        })
    }

    /// Append a single event and fsync. One reservation write maps to one
    /// journal commit — the admission lock upstream already serializes
    /// writers, so there is no batch to group-commit.
    pub fn append(&mut self, event: &Event) -> io::Result<()> {
        encode_event(&mut self.writer, event)?;
        self.appends_since_compact += 1;
        self.flush_sync()
    }

    /// Flush the BufWriter and fsync the underlying file.
    fn flush_sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }

    /// Return the journal file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write compacted events to a temp file and fsync.
    pub fn write_compact_file(path: &Path, events: &[Event]) -> io::Result<()> {
        let tmp_path = path.with_extension("wal.tmp");
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        for event in events {
            encode_event(&mut writer, event)?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Atomic swap: rename temp file over the journal and reopen.
    pub fn swap_compact_file(&mut self) -> io::Result<()> {
        let tmp_path = self.path.with_extension("wal.tmp");
        fs::rename(&tmp_path, &self.path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.appends_since_compact = 0;
        Ok(())
    }

    /// Replace the journal with a minimal set of events that recreates the
    /// current state.
    pub fn compact(&mut self, events: &[Event]) -> io::Result<()> {
        Self::write_compact_file(&self.path, events)?;
        self.swap_compact_file()
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }

    /// Replay the journal from disk, returning all valid events.
    /// Truncated/corrupt trailing entries are silently discarded.
    pub fn replay(path: &Path) -> io::Result<Vec<Event>> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut reader = BufReader::new(file);
        let mut events = Vec::new();

        loop {
            // Read length prefix
            let mut len_buf = [0u8; 4];
            match reader.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
            let len = u32::from_le_bytes(len_buf) as usize;

            // Read payload
            let mut payload = vec![0u8; len];
            match reader.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break, // truncated
                Err(e) => return Err(e),
            }

            // Read CRC
            let mut crc_buf = [0u8; 4];
            match reader.read_exact(&mut crc_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break, // truncated
                Err(e) => return Err(e),
            }
            let stored_crc = u32::from_le_bytes(crc_buf);
            let computed_crc = crc32fast::hash(&payload);

            if stored_crc != computed_crc {
                // Corrupt entry — stop replaying
                break;
            }

            match bincode::deserialize::<Event>(&payload) {
                Ok(event) => events.push(event),
                Err(_) => break, // corrupt payload
            }
        }

        Ok(events)
    }
}

/// Durable [`ReservationStore`]: an in-memory mirror fronted by the journal.
/// Every mutation is appended and fsynced before it becomes visible in
/// memory, so a reopened store replays exactly the committed state.
pub struct WalStore {
    mem: MemoryStore,
    wal: Mutex<Wal>,
}

impl WalStore {
    /// Open the journal at `path`, replaying committed events into memory.
    pub fn open(path: &Path) -> io::Result<Self> {
        let events = Wal::replay(path)?;
        let mem = MemoryStore::new();
        for event in &events {
            mem.apply(event);
        }
        Ok(Self {
            mem,
            wal: Mutex::new(Wal::open(path)?),
        })
    }

    /// Rewrite the journal as the minimal `Inserted` set for the live state.
    pub async fn compact(&self) -> Result<(), StoreError> {
        let mut events = Vec::new();
        for kind in [ReservationKind::Booking, ReservationKind::Block] {
            for rsv in self.mem.list_all(kind).await? {
                events.push(Event::Inserted(rsv));
            }
        }
        let mut wal = self.wal.lock().await;
        wal.compact(&events).map_err(io_err)
    }

    pub async fn appends_since_compact(&self) -> u64 {
        self.wal.lock().await.appends_since_compact()
    }

    /// Append to the journal, then apply in memory. Journal failure leaves
    /// the in-memory state untouched.
    async fn commit(&self, event: Event) -> Result<(), StoreError> {
        let mut wal = self.wal.lock().await;
        wal.append(&event).map_err(io_err)?;
        self.mem.apply(&event);
        Ok(())
    }
}

fn io_err(e: io::Error) -> StoreError {
    StoreError::Io(e.to_string())
}

#[async_trait]
impl ReservationStore for WalStore {
    async fn list_all(&self, kind: ReservationKind) -> Result<Vec<Reservation>, StoreError> {
        self.mem.list_all(kind).await
    }

    async fn get(&self, kind: ReservationKind, id: Ulid) -> Result<Reservation, StoreError> {
        self.mem.get(kind, id).await
    }

    async fn insert(&self, mut reservation: Reservation) -> Result<Reservation, StoreError> {
        if reservation.is_draft() {
            reservation.id = Ulid::new();
        } else if self.mem.get(reservation.kind, reservation.id).await.is_ok() {
            return Err(StoreError::AlreadyExists {
                kind: reservation.kind,
                id: reservation.id,
            });
        }
        self.commit(Event::Inserted(reservation.clone())).await?;
        Ok(reservation)
    }

    async fn update(&self, reservation: &Reservation) -> Result<(), StoreError> {
        // Existence check first so a miss never reaches the journal
        self.mem.get(reservation.kind, reservation.id).await?;
        self.commit(Event::Updated(reservation.clone())).await
    }

    async fn delete(&self, kind: ReservationKind, id: Ulid) -> Result<(), StoreError> {
        self.mem.get(kind, id).await?;
        self.commit(Event::Deleted { kind, id }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DateRange;
    use chrono::NaiveDate;

    fn tmp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("staylock_test_wal");
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    fn booking(sm: u32, sd: u32, em: u32, ed: u32) -> Reservation {
        Reservation {
            id: Ulid::new(),
            kind: ReservationKind::Booking,
            range: DateRange::new(d(sm, sd), d(em, ed)),
        }
    }

    #[test]
    fn append_and_replay() {
        let path = tmp_path("append_and_replay.wal");
        let _ = fs::remove_file(&path);

        let events = vec![
            Event::Inserted(booking(1, 10, 1, 15)),
            Event::Inserted(booking(2, 1, 2, 5)),
        ];

        {
            let mut wal = Wal::open(&path).unwrap();
            for e in &events {
                wal.append(e).unwrap();
            }
        }

        let replayed = Wal::replay(&path).unwrap();
        assert_eq!(replayed, events);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn replay_handles_truncation() {
        let path = tmp_path("truncation.wal");
        let _ = fs::remove_file(&path);

        let event = Event::Inserted(booking(1, 10, 1, 15));

        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&event).unwrap();
        }

        // Append garbage to simulate a truncated second entry
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[0u8; 6]).unwrap(); // partial length + some bytes
        }

        let replayed = Wal::replay(&path).unwrap();
        assert_eq!(replayed.len(), 1);
        assert_eq!(replayed[0], event);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn replay_nonexistent_file() {
        let path = tmp_path("nonexistent.wal");
        let _ = fs::remove_file(&path);
        let replayed = Wal::replay(&path).unwrap();
        assert!(replayed.is_empty());
    }

    #[test]
    fn replay_corrupt_crc() {
        let path = tmp_path("corrupt_crc.wal");
        let _ = fs::remove_file(&path);

        let event = Event::Deleted {
            kind: ReservationKind::Block,
            id: Ulid::new(),
        };

        // Manually write an entry with bad CRC
        {
            let payload = bincode::serialize(&event).unwrap();
            let len = payload.len() as u32;
            let bad_crc: u32 = 0xDEADBEEF;

            let mut f = File::create(&path).unwrap();
            f.write_all(&len.to_le_bytes()).unwrap();
            f.write_all(&payload).unwrap();
            f.write_all(&bad_crc.to_le_bytes()).unwrap();
        }

        let replayed = Wal::replay(&path).unwrap();
        assert!(replayed.is_empty());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn compact_reduces_wal() {
        let path = tmp_path("compact_reduce.wal");
        let _ = fs::remove_file(&path);

        let keeper = booking(1, 10, 1, 15);

        // Write churn: one keeper plus insert/delete pairs
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&Event::Inserted(keeper.clone())).unwrap();
            for _ in 0..10 {
                let tmp = booking(3, 1, 3, 5);
                wal.append(&Event::Inserted(tmp.clone())).unwrap();
                wal.append(&Event::Deleted {
                    kind: tmp.kind,
                    id: tmp.id,
                })
                .unwrap();
            }
        }

        let before = fs::metadata(&path).unwrap().len();
        assert!(before > 0);

        let compacted_events = vec![Event::Inserted(keeper)];
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.compact(&compacted_events).unwrap();
        }

        let after = fs::metadata(&path).unwrap().len();
        assert!(after < before, "compacted journal should be smaller: {after} < {before}");

        let replayed = Wal::replay(&path).unwrap();
        assert_eq!(replayed, compacted_events);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn compact_then_append() {
        let path = tmp_path("compact_append.wal");
        let _ = fs::remove_file(&path);

        let compacted = vec![Event::Inserted(booking(1, 10, 1, 15))];
        let new_event = Event::Inserted(booking(2, 1, 2, 5));

        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&compacted[0]).unwrap();
            wal.compact(&compacted).unwrap();
            wal.append(&new_event).unwrap();
        }

        let replayed = Wal::replay(&path).unwrap();
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[0], compacted[0]);
        assert_eq!(replayed[1], new_event);

        let _ = fs::remove_file(&path);
    }

    #[tokio::test]
    async fn wal_store_survives_reopen() {
        let path = tmp_path("store_reopen.wal");
        let _ = fs::remove_file(&path);

        let kept;
        {
            let store = WalStore::open(&path).unwrap();
            kept = store
                .insert(Reservation::draft(
                    ReservationKind::Booking,
                    DateRange::new(d(2, 1), d(2, 10)),
                ))
                .await
                .unwrap();
            let doomed = store
                .insert(Reservation::draft(
                    ReservationKind::Block,
                    DateRange::new(d(6, 1), d(6, 5)),
                ))
                .await
                .unwrap();
            store.delete(ReservationKind::Block, doomed.id).await.unwrap();
        }

        let reopened = WalStore::open(&path).unwrap();
        let bookings = reopened.list_all(ReservationKind::Booking).await.unwrap();
        assert_eq!(bookings, vec![kept]);
        assert!(reopened
            .list_all(ReservationKind::Block)
            .await
            .unwrap()
            .is_empty());

        let _ = fs::remove_file(&path);
    }

    #[tokio::test]
    async fn wal_store_update_survives_reopen() {
        let path = tmp_path("store_update_reopen.wal");
        let _ = fs::remove_file(&path);

        let created = {
            let store = WalStore::open(&path).unwrap();
            let created = store
                .insert(Reservation::draft(
                    ReservationKind::Booking,
                    DateRange::new(d(2, 1), d(2, 10)),
                ))
                .await
                .unwrap();
            let moved = Reservation {
                range: DateRange::new(d(2, 2), d(2, 9)),
                ..created.clone()
            };
            store.update(&moved).await.unwrap();
            moved
        };

        let reopened = WalStore::open(&path).unwrap();
        let got = reopened
            .get(ReservationKind::Booking, created.id)
            .await
            .unwrap();
        assert_eq!(got.range, created.range);

        let _ = fs::remove_file(&path);
    }

    #[tokio::test]
    async fn wal_store_compact_preserves_state() {
        let path = tmp_path("store_compact.wal");
        let _ = fs::remove_file(&path);

        let store = WalStore::open(&path).unwrap();
        for m in 1..=4u32 {
            store
                .insert(Reservation::draft(
                    ReservationKind::Booking,
                    DateRange::new(d(m, 1), d(m, 10)),
                ))
                .await
                .unwrap();
        }
        assert_eq!(store.appends_since_compact().await, 4);

        store.compact().await.unwrap();
        assert_eq!(store.appends_since_compact().await, 0);

        let reopened = WalStore::open(&path).unwrap();
        assert_eq!(
            reopened
                .list_all(ReservationKind::Booking)
                .await
                .unwrap()
                .len(),
            4
        );

        let _ = fs::remove_file(&path);
    }
}
