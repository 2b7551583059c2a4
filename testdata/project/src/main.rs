fn main() {
    // TODO: FIXME both keywords here
}
