pub mod core;
pub mod storage;
pub mod schema;
pub mod index;
pub mod search;
pub mod writer;
pub mod generation;
pub mod control;

/*
┌──────────────────────────────────────────────────────────────────────────────┐
│                           SEEDSTORE ARCHITECTURE                             │
└──────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── CONTROL LAYER ───────────────────────────────┐
│  struct Controller                                                           │
│    store: StoreHandle              // OnceCell<Arc<dyn RecordStore>>         │
│    generation: Arc<GenerationEngine>                                         │
│    query: QueryEngine                                                        │
│    events: EventBus                // broadcast::Sender<GenerationEvent>     │
│                                                                              │
│  {"action":"generateRecords"} ──► handle_command ──► GenerationEngine::spawn │
│  searchQuery/offset/limit     ──► handle_search  ──► QueryEngine::search     │
└──────────────────────────────────────────────────────────────────────────────┘
                 │                                        │
                 ▼                                        ▼
┌────────── GenerationEngine ─────────┐   ┌──────────── QueryEngine ────────────┐
│ filling: AtomicBool (FillLatch)     │   │ prefix_cursor(prefix)               │
│ StartClear ─► clear()               │   │ Skipping{remaining} ─► advance(n)   │
│ StartFill  ─► BatchPlan             │   │ Collecting ─► next_record()         │
│   write_batch ─► Progress{percent}  │   │ limit reached ─► has_next()         │
│ flush() ─► Complete                 │   │ ─► SearchPage { has_more, records } │
└─────────────────────────────────────┘   └─────────────────────────────────────┘
                 │                                        │
                 ▼                                        ▼
┌──────────────────────────────── STORAGE LAYER ───────────────────────────────┐
│  struct Store (impl RecordStore)                                             │
│    collection: RwLock<Collection>   // BTreeMap<RecordId, Arc<str>>          │
│                                     // DataIndex: BTreeSet<(Arc<str>, Id)>   │
│    writer: Mutex<StoreWriter>       // WAL + Checkpoint                      │
│    _lock: FileLock                  // flock on <base>/.lock                 │
│                                                                              │
│  <base>/meta/schema.json      CollectionSchema ("store", index "data_idx")   │
│  <base>/meta/checkpoint.bin   Checkpoint { wal_generation, segment, ... }    │
│  <base>/segments/<uuid>.seg   SegmentHeader + LZ4 blocks of Records          │
│  <base>/wal/wal_NNNNNNNN.log  [len][crc32][bincode WALEntry] frames          │
└──────────────────────────────────────────────────────────────────────────────┘
*/
