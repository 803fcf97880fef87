// end to end tests of the file system over a small device
use oskit::dev::{DiskImage,SECTOR_SIZE};
use oskit::fs::{FileSystem,FileType,Error};

fn fresh_fs(num_sectors: usize) -> FileSystem {
    let time = chrono::NaiveDate::from_ymd_opt(2022,8,31).unwrap().and_hms_opt(3,48,0);
    FileSystem::format(DiskImage::new(num_sectors),time).expect("format failed")
}

/// sectors taken by the bootstrap layout on a 128 sector device:
/// 3 headers + 1 free map sector + 2 root sectors + 8 pipe sectors
const BOOTSTRAP_SECTORS: usize = 14;

#[test]
fn format_and_query() {
    let fs = fresh_fs(128);
    assert_eq!(fs.list("/").expect("list failed").len(),0);
    assert_eq!(fs.num_clear(),128-BOOTSTRAP_SECTORS);
    let stats = fs.stat().expect("stat failed");
    assert_eq!(stats["num_sectors"],128);
    assert_eq!(stats["sector_size"],SECTOR_SIZE);
    assert_eq!(stats["free_sectors"],128-BOOTSTRAP_SECTORS);
    assert_eq!(stats["root_files"],0);
}

#[test]
fn create_and_reopen() {
    let mut fs = fresh_fs(128);
    fs.create("/a",FileType::Directory,None).expect("create dir failed");
    fs.create("/a/b",FileType::File,None).expect("create file failed");
    let mut f = fs.open("/a/b").expect("open failed");
    assert_eq!(f.length(),0);
    fs.write_file_at(&mut f,b"hello world\n",0).expect("write failed");

    // remount from the flattened image and read it back
    let img = DiskImage::from_bytes(&fs.to_bytes()).expect("image rejected");
    let fs2 = FileSystem::mount(img).expect("mount failed");
    let f2 = fs2.open("/a/b").expect("reopen failed");
    assert_eq!(f2.length(),12);
    assert_eq!(fs2.read_file_at(&f2,12,0).expect("read failed"),b"hello world\n".to_vec());
}

#[test]
fn remove_reclaims_sectors() {
    let mut fs = fresh_fs(128);
    fs.create("/a",FileType::Directory,None).expect("create dir failed");
    let free_after_mkdir = fs.num_clear();
    fs.create("/a/b",FileType::File,None).expect("create file failed");
    let mut f = fs.open("/a/b").expect("open failed");
    fs.write_file_at(&mut f,b"hello world\n",0).expect("write failed");
    assert!(fs.num_clear() < free_after_mkdir);
    fs.remove("/a/b").expect("remove failed");
    assert_eq!(fs.num_clear(),free_after_mkdir);
    assert!(matches!(fs.open("/a/b"),Err(Error::NotFound)));
}

#[test]
fn path_errors() {
    let mut fs = fresh_fs(128);
    // parent does not exist
    assert!(matches!(fs.create("/x/y",FileType::File,None),Err(Error::NotFound)));
    // the root itself cannot be created
    assert!(matches!(fs.create("/",FileType::File,None),Err(Error::BadArgument)));
    // duplicates are refused
    fs.create("/a",FileType::Directory,None).expect("create dir failed");
    assert!(matches!(fs.create("/a",FileType::Directory,None),Err(Error::Exists)));
    // a file is not a directory
    fs.create("/f",FileType::File,None).expect("create file failed");
    assert!(matches!(fs.create("/f/x",FileType::File,None),Err(Error::NotDirectory)));
}

#[test]
fn path_lookup_is_idempotent() {
    let mut fs = fresh_fs(128);
    fs.create("/a",FileType::Directory,None).expect("create dir failed");
    fs.create("/a/b",FileType::File,None).expect("create file failed");
    fs.create("/other",FileType::File,None).expect("create file failed");
    let first = fs.find("/a/b").expect("find failed");
    // opening and dropping unrelated files does not perturb the result
    {
        let f = fs.open("/other").expect("open failed");
        let _ = fs.read_file_at(&f,10,0);
    }
    assert_eq!(fs.find("/a/b").expect("find failed"),first);
}

#[test]
fn free_map_coverage() {
    let mut fs = fresh_fs(128);
    fs.create("/a",FileType::Directory,None).expect("create dir failed");
    fs.create("/a/b",FileType::File,None).expect("create file failed");
    let mut f = fs.open("/a/b").expect("open failed");
    fs.write_file_at(&mut f,&[7;300],0).expect("write failed");
    // accounting: bootstrap + dir header + dir data + file header + file data
    let dir = fs.open("/a").expect("open dir failed");
    let file = fs.open("/a/b").expect("open file failed");
    let used = BOOTSTRAP_SECTORS
        + 1 + dir.hdr.num_sectors()
        + 1 + file.hdr.num_sectors();
    assert_eq!(fs.num_clear(),128-used);
    assert_eq!(file.hdr.num_sectors(),3);
}

#[test]
fn deep_paths_and_listing() {
    let mut fs = fresh_fs(256);
    fs.create("/a",FileType::Directory,None).expect("create failed");
    fs.create("/a/b",FileType::Directory,None).expect("create failed");
    fs.create("/a/b/c",FileType::File,None).expect("create failed");
    // leading and repeated slashes are tolerated
    assert!(fs.find("//a///b/c").is_ok());
    assert_eq!(fs.list("/a/b").expect("list failed"),vec!["c".to_string()]);
    assert_eq!(fs.list("/").expect("list failed"),vec!["a".to_string()]);
    // removing a non-empty directory is refused
    assert!(fs.remove("/a/b").is_err());
    fs.remove("/a/b/c").expect("remove failed");
    fs.remove("/a/b").expect("remove failed");
}

#[test]
fn long_names_truncate() {
    let mut fs = fresh_fs(128);
    fs.create("/abcdefghijkl",FileType::File,None).expect("create failed");
    // lookup under any name sharing the first nine bytes succeeds
    assert!(fs.find("/abcdefghijkl").is_ok());
    assert!(fs.find("/abcdefghiXYZ").is_ok());
    assert!(fs.find("/abcdefgh").is_err());
    // and a second name equal under truncation is a duplicate
    assert!(matches!(fs.create("/abcdefghiQQ",FileType::File,None),Err(Error::Exists)));
}

#[test]
fn directory_growth_past_initial_size() {
    let mut fs = fresh_fs(256);
    // push the root past its ten initial slots
    for i in 0..14 {
        let path = format!("/f{}",i);
        fs.create(&path,FileType::File,None).expect("create failed");
    }
    let names = fs.list("/").expect("list failed");
    assert_eq!(names.len(),14);
    for i in 0..14 {
        assert!(fs.find(&format!("/f{}",i)).is_ok()," f{} missing",i);
    }
    // a removed name stays gone across the growth boundary
    fs.remove("/f3").expect("remove failed");
    assert!(fs.find("/f3").is_err());
    assert_eq!(fs.list("/").expect("list failed").len(),13);
}

#[test]
fn file_spills_into_indirect_sectors() {
    let mut fs = fresh_fs(256);
    fs.create("/big",FileType::File,None).expect("create failed");
    let mut f = fs.open("/big").expect("open failed");
    let dat: Vec<u8> = (0..30*SECTOR_SIZE).map(|i| (i%251) as u8).collect();
    fs.write_file_at(&mut f,&dat,0).expect("write failed");
    let img = DiskImage::from_bytes(&fs.to_bytes()).expect("image rejected");
    let fs2 = FileSystem::mount(img).expect("mount failed");
    let f2 = fs2.open("/big").expect("reopen failed");
    assert_eq!(fs2.read_file_at(&f2,30*SECTOR_SIZE,0).expect("read failed"),dat);
    // 30 data sectors means the direct table overflowed
    assert_eq!(f2.hdr.num_sectors(),30);
}

#[test]
fn pipe_round_trip() {
    let mut fs = fresh_fs(128);
    let free0 = fs.num_clear();
    assert_eq!(fs.write_pipe(b"ping").expect("write pipe failed"),4);
    assert_eq!(fs.read_pipe(100).expect("read pipe failed"),b"ping".to_vec());
    assert_eq!(fs.read_pipe(2).expect("read pipe failed"),b"pi".to_vec());
    // the pipe reuses its preallocated sectors
    assert_eq!(fs.num_clear(),free0);
    // a shorter message shortens the queue
    fs.write_pipe(b"on").expect("write pipe failed");
    assert_eq!(fs.read_pipe(100).expect("read pipe failed"),b"on".to_vec());
}

#[test]
fn no_space_is_clean() {
    let mut fs = fresh_fs(32);
    fs.create("/a",FileType::File,None).expect("create failed");
    let mut f = fs.open("/a").expect("open failed");
    let free0 = fs.num_clear();
    // ask for far more than the device holds
    assert!(fs.write_file_at(&mut f,&vec![0;40*SECTOR_SIZE],0).is_err());
    assert_eq!(fs.num_clear(),free0);
}
